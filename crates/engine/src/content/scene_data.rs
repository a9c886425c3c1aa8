use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use roxmltree::Node;

use crate::collision::{HitRect, HitRectList, Rect, RectList, RectListItem, SubRect};
use crate::hash::format_hash;
use crate::message::{MessageParam, Point};
use crate::vars::VariableStore;

use super::error::{parse_document, read_error, ContentError, ContentErrorCode, XmlContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageListEntry {
    pub num: u32,
    pub param: MessageParam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCondition {
    Global { name: u32, equals: u32 },
    Sub { name: u32, sub: u32, equals: u32 },
    Local { key: u32, equals: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    SetMessageList(u32),
    CancelMessageList,
}

/// `(opcode, param, conditions) -> action` row of a scene's message table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRule {
    pub opcode: u32,
    /// `None` matches any integer param.
    pub param: Option<u32>,
    pub conditions: Vec<TriggerCondition>,
    pub action: TriggerAction,
}

impl TriggerRule {
    pub fn matches(
        &self,
        num: u32,
        param: &MessageParam,
        vars: &VariableStore,
        locals: &BTreeMap<u32, u32>,
    ) -> bool {
        if num != self.opcode {
            return false;
        }
        if self.param.is_some_and(|expected| expected != param.as_integer()) {
            return false;
        }
        self.conditions.iter().all(|condition| match *condition {
            TriggerCondition::Global { name, equals } => vars.global_var(name) == equals,
            TriggerCondition::Sub { name, sub, equals } => vars.sub_var(name, sub) == equals,
            TriggerCondition::Local { key, equals } => {
                locals.get(&key).copied().unwrap_or(0) == equals
            }
        })
    }
}

/// Authored per-scene tables: scripts, floor rects, click regions, points
/// and message triggers.
#[derive(Debug, Clone, Default)]
pub struct SceneData {
    pub message_lists: HashMap<u32, Arc<[MessageListEntry]>>,
    pub hit_rects: Arc<HitRectList>,
    pub rect_lists: HashMap<u32, RectList>,
    pub points: HashMap<u32, Point>,
    pub triggers: Vec<TriggerRule>,
}

impl SceneData {
    pub fn message_list(&self, id: u32) -> Option<Arc<[MessageListEntry]>> {
        self.message_lists.get(&id).cloned()
    }

    pub fn rect_list(&self, id: u32) -> Option<&RectList> {
        self.rect_lists.get(&id)
    }

    pub fn point(&self, id: u32) -> Option<Point> {
        self.points.get(&id).copied()
    }
}

pub fn load_scene_data(path: &Path) -> Result<SceneData, ContentError> {
    let raw = fs::read_to_string(path).map_err(|source| read_error(path, source))?;
    parse_scene_data(path, &raw)
}

pub fn parse_scene_data(file_path: &Path, raw: &str) -> Result<SceneData, ContentError> {
    let doc = parse_document(file_path, raw)?;
    let ctx = XmlContext {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "SceneData" {
        return Err(ctx.error(
            ContentErrorCode::InvalidRoot,
            "root element must be <SceneData>".to_string(),
            root,
        ));
    }

    let mut data = SceneData::default();
    let mut hit_rects = Vec::<HitRect>::new();
    let mut list_refs = Vec::<(u32, Node<'_, '_>)>::new();

    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "MessageList" => {
                let id = ctx.hash_attr(child, "id")?;
                let entries = parse_message_list(&ctx, child)?;
                if data.message_lists.insert(id, entries.into()).is_some() {
                    return Err(duplicate(&ctx, "MessageList", id, child));
                }
            }
            "HitRects" => {
                for rect_node in element_children(child) {
                    expect_tag(&ctx, rect_node, "HitRect")?;
                    let rect = parse_rect(&ctx, rect_node)?;
                    let kind = ctx.hash_attr(rect_node, "type")?;
                    let kind = u16::try_from(kind).map_err(|_| {
                        ctx.error(
                            ContentErrorCode::InvalidValue,
                            format!("hit-rect type {} does not fit 16 bits", format_hash(kind)),
                            rect_node,
                        )
                    })?;
                    hit_rects.push(HitRect { rect, kind });
                }
            }
            "RectList" => {
                let id = ctx.hash_attr(child, "id")?;
                let mut items = Vec::new();
                for item_node in element_children(child) {
                    expect_tag(&ctx, item_node, "Rect")?;
                    let rect = parse_rect(&ctx, item_node)?;
                    let mut sub_rects = Vec::new();
                    for sub_node in element_children(item_node) {
                        expect_tag(&ctx, sub_node, "SubRect")?;
                        let sub_rect = parse_rect(&ctx, sub_node)?;
                        let message_list = ctx.hash_attr(sub_node, "messageList")?;
                        list_refs.push((message_list, sub_node));
                        sub_rects.push(SubRect {
                            rect: sub_rect,
                            message_list,
                        });
                    }
                    items.push(RectListItem { rect, sub_rects });
                }
                if data.rect_lists.insert(id, RectList { items }).is_some() {
                    return Err(duplicate(&ctx, "RectList", id, child));
                }
            }
            "Point" => {
                let id = ctx.hash_attr(child, "name")?;
                let point = Point::new(ctx.i32_attr(child, "x")?, ctx.i32_attr(child, "y")?);
                if data.points.insert(id, point).is_some() {
                    return Err(duplicate(&ctx, "Point", id, child));
                }
            }
            "Trigger" => {
                let rule = parse_trigger(&ctx, child)?;
                if let TriggerAction::SetMessageList(id) = rule.action {
                    list_refs.push((id, child));
                }
                data.triggers.push(rule);
            }
            other => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownElement,
                    format!("unknown element <{}> in <SceneData>", other),
                    child,
                ))
            }
        }
    }

    for (id, node) in list_refs {
        if !data.message_lists.contains_key(&id) {
            return Err(ctx.error(
                ContentErrorCode::UnknownReference,
                format!("message list {} is not defined in this file", format_hash(id)),
                node,
            ));
        }
    }

    data.hit_rects = Arc::new(HitRectList::new(hit_rects));
    Ok(data)
}

fn parse_message_list(
    ctx: &XmlContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<Vec<MessageListEntry>, ContentError> {
    let mut entries = Vec::new();
    for message in element_children(node) {
        expect_tag(ctx, message, "Message")?;
        let num = ctx.hash_attr(message, "num")?;
        let param = match (message.attribute("value"), message.attribute("x")) {
            (Some(_), Some(_)) => {
                return Err(ctx.error(
                    ContentErrorCode::InvalidValue,
                    format!(
                        "message {} has both 'value' and a point; pick one",
                        format_hash(num)
                    ),
                    message,
                ))
            }
            (Some(_), None) => MessageParam::Integer(ctx.hash_attr(message, "value")?),
            (None, Some(_)) => MessageParam::Point(Point::new(
                ctx.i32_attr(message, "x")?,
                ctx.i32_attr(message, "y")?,
            )),
            (None, None) => MessageParam::Integer(0),
        };
        entries.push(MessageListEntry { num, param });
    }
    Ok(entries)
}

fn parse_trigger(ctx: &XmlContext<'_, '_>, node: Node<'_, '_>) -> Result<TriggerRule, ContentError> {
    let opcode = ctx.hash_attr(node, "opcode")?;
    let param = ctx.optional_hash_attr(node, "param")?;
    let action = match (ctx.optional_hash_attr(node, "messageList")?, node.attribute("cancel")) {
        (Some(id), None) => TriggerAction::SetMessageList(id),
        (None, Some("true")) => TriggerAction::CancelMessageList,
        _ => {
            return Err(ctx.error(
                ContentErrorCode::InvalidValue,
                format!(
                    "trigger for {} needs exactly one of messageList or cancel=\"true\"",
                    format_hash(opcode)
                ),
                node,
            ))
        }
    };

    let mut conditions = Vec::new();
    for condition in element_children(node) {
        let equals = ctx.hash_attr(condition, "equals")?;
        let parsed = match condition.tag_name().name() {
            "IfGlobal" => TriggerCondition::Global {
                name: ctx.hash_attr(condition, "name")?,
                equals,
            },
            "IfSub" => TriggerCondition::Sub {
                name: ctx.hash_attr(condition, "name")?,
                sub: ctx.hash_attr(condition, "sub")?,
                equals,
            },
            "IfLocal" => TriggerCondition::Local {
                key: ctx.hash_attr(condition, "key")?,
                equals,
            },
            other => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownElement,
                    format!("unknown condition <{}> in <Trigger>", other),
                    condition,
                ))
            }
        };
        conditions.push(parsed);
    }

    Ok(TriggerRule {
        opcode,
        param,
        conditions,
        action,
    })
}

fn parse_rect(ctx: &XmlContext<'_, '_>, node: Node<'_, '_>) -> Result<Rect, ContentError> {
    let rect = Rect::new(
        ctx.i32_attr(node, "x1")?,
        ctx.i32_attr(node, "y1")?,
        ctx.i32_attr(node, "x2")?,
        ctx.i32_attr(node, "y2")?,
    );
    if !rect.is_well_formed() {
        return Err(ctx.error(
            ContentErrorCode::InvalidValue,
            format!(
                "<{}> ({}, {})-({}, {}) is inverted; need x1 <= x2 and y1 <= y2",
                node.tag_name().name(),
                rect.x1,
                rect.y1,
                rect.x2,
                rect.y2
            ),
            node,
        ));
    }
    Ok(rect)
}

fn expect_tag(ctx: &XmlContext<'_, '_>, node: Node<'_, '_>, tag: &str) -> Result<(), ContentError> {
    if node.tag_name().name() == tag {
        return Ok(());
    }
    let parent = node
        .parent_element()
        .map(|parent| parent.tag_name().name().to_string())
        .unwrap_or_default();
    Err(ctx.error(
        ContentErrorCode::UnknownElement,
        format!(
            "unexpected <{}> in <{}>; expected <{}>",
            node.tag_name().name(),
            parent,
            tag
        ),
        node,
    ))
}

fn duplicate(ctx: &XmlContext<'_, '_>, what: &str, id: u32, node: Node<'_, '_>) -> ContentError {
    ctx.error(
        ContentErrorCode::DuplicateId,
        format!("duplicate {} id {}", what, format_hash(id)),
        node,
    )
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

mod atomic_io;
mod error;
mod resources;
mod scene_data;

pub use atomic_io::write_file_atomic;
pub use error::{ContentError, ContentErrorCode, SourceLocation};
pub use resources::{load_resource_manifest, parse_resource_manifest, ResourceError};
pub use scene_data::{
    load_scene_data, parse_scene_data, MessageListEntry, SceneData, TriggerAction,
    TriggerCondition, TriggerRule,
};

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Bitmap,
    Palette,
    Animation,
    Data,
    Sound,
    Video,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInfo {
    /// Hash reported through frame-event messages; 0 means no event.
    pub frame_hash: u32,
    pub delta_x: i32,
    pub delta_y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationInfo {
    pub frames: Vec<FrameInfo>,
}

impl AnimationInfo {
    pub fn new(frames: Vec<FrameInfo>) -> Self {
        Self { frames }
    }

    /// Evenly paced animation without frame events.
    pub fn uniform(frame_count: usize, delta_x: i32) -> Self {
        Self {
            frames: vec![
                FrameInfo {
                    delta_x,
                    ..FrameInfo::default()
                };
                frame_count
            ],
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&FrameInfo> {
        self.frames.get(index)
    }

    /// Index of the first frame carrying `frame_hash`.
    pub fn frame_index_of(&self, frame_hash: u32) -> Option<usize> {
        self.frames
            .iter()
            .position(|frame| frame.frame_hash == frame_hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Asset access consumed by the runtime core.
///
/// Every lookup is fallible through `None`; callers skip the dependent
/// visual instead of failing.
pub trait ResourceFacade {
    fn load(&mut self, hash: u32) -> Option<ResourceHandle>;
    fn unload(&mut self, handle: ResourceHandle);
    fn use_resource(&mut self, hash: u32) -> Option<ResourceHandle>;
    fn unuse_resource(&mut self, handle: ResourceHandle);
    fn resource_type(&self, handle: ResourceHandle) -> Option<ResourceType>;
    fn load_resource(&mut self, handle: ResourceHandle) -> Option<Arc<[u8]>>;
    fn is_resource_data_valid(&self, handle: ResourceHandle) -> bool;
    fn animation(&self, hash: u32) -> Option<Arc<AnimationInfo>>;
    fn frame_image(&self, hash: u32, frame_index: usize) -> Option<&FrameImage>;
}

#[derive(Debug, Clone)]
struct ResourceEntry {
    hash: u32,
    kind: ResourceType,
    bytes: Arc<[u8]>,
    animation: Option<Arc<AnimationInfo>>,
    frame_images: Vec<FrameImage>,
    use_count: u32,
    resident: bool,
}

/// Reference-counted in-memory resource table.
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    entries: Vec<ResourceEntry>,
    by_hash: HashMap<u32, usize>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_animation(&mut self, hash: u32, info: AnimationInfo) {
        self.insert_entry(ResourceEntry {
            hash,
            kind: ResourceType::Animation,
            bytes: Arc::from(Vec::new()),
            animation: Some(Arc::new(info)),
            frame_images: Vec::new(),
            use_count: 0,
            resident: false,
        });
    }

    pub fn insert_bytes(&mut self, hash: u32, kind: ResourceType, bytes: Vec<u8>) {
        self.insert_entry(ResourceEntry {
            hash,
            kind,
            bytes: Arc::from(bytes),
            animation: None,
            frame_images: Vec::new(),
            use_count: 0,
            resident: false,
        });
    }

    /// Attaches decoded frame images to a previously inserted animation.
    pub fn set_frame_images(&mut self, hash: u32, images: Vec<FrameImage>) -> bool {
        match self.by_hash.get(&hash) {
            Some(index) => {
                self.entries[*index].frame_images = images;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, hash: u32) -> bool {
        self.by_hash.contains_key(&hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn use_count(&self, hash: u32) -> u32 {
        self.by_hash
            .get(&hash)
            .map(|index| self.entries[*index].use_count)
            .unwrap_or(0)
    }

    fn insert_entry(&mut self, entry: ResourceEntry) {
        match self.by_hash.get(&entry.hash) {
            Some(index) => self.entries[*index] = entry,
            None => {
                self.by_hash.insert(entry.hash, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn entry_mut(&mut self, handle: ResourceHandle) -> Option<&mut ResourceEntry> {
        self.entries.get_mut(handle.0 as usize)
    }

    fn entry(&self, handle: ResourceHandle) -> Option<&ResourceEntry> {
        self.entries.get(handle.0 as usize)
    }
}

impl ResourceFacade for MemoryResources {
    fn load(&mut self, hash: u32) -> Option<ResourceHandle> {
        let handle = self.use_resource(hash)?;
        if let Some(entry) = self.entry_mut(handle) {
            entry.resident = true;
        }
        Some(handle)
    }

    fn unload(&mut self, handle: ResourceHandle) {
        self.unuse_resource(handle);
        if let Some(entry) = self.entry_mut(handle) {
            if entry.use_count == 0 {
                entry.resident = false;
            }
        }
    }

    fn use_resource(&mut self, hash: u32) -> Option<ResourceHandle> {
        let index = *self.by_hash.get(&hash)?;
        let entry = &mut self.entries[index];
        entry.use_count = entry.use_count.saturating_add(1);
        Some(ResourceHandle(index as u32))
    }

    fn unuse_resource(&mut self, handle: ResourceHandle) {
        if let Some(entry) = self.entry_mut(handle) {
            entry.use_count = entry.use_count.saturating_sub(1);
        }
    }

    fn resource_type(&self, handle: ResourceHandle) -> Option<ResourceType> {
        self.entry(handle).map(|entry| entry.kind)
    }

    fn load_resource(&mut self, handle: ResourceHandle) -> Option<Arc<[u8]>> {
        let entry = self.entry_mut(handle)?;
        entry.resident = true;
        Some(Arc::clone(&entry.bytes))
    }

    fn is_resource_data_valid(&self, handle: ResourceHandle) -> bool {
        self.entry(handle).is_some_and(|entry| entry.resident)
    }

    fn animation(&self, hash: u32) -> Option<Arc<AnimationInfo>> {
        let index = self.by_hash.get(&hash)?;
        self.entries[*index].animation.clone()
    }

    fn frame_image(&self, hash: u32, frame_index: usize) -> Option<&FrameImage> {
        let index = self.by_hash.get(&hash)?;
        self.entries[*index].frame_images.get(frame_index)
    }
}

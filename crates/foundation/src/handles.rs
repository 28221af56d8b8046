/// Opaque handle to a marker owned by the map collaborator.
///
/// The map hands these out from `add_marker`; the core never interprets the
/// value beyond equality.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarkerHandle(u32);

impl MarkerHandle {
    pub fn new(raw: u32) -> Self {
        MarkerHandle(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

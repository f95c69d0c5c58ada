/// Whether remote calls can currently succeed. Checked before every page
/// and batch so a lost connection ends a loop early instead of failing
/// request by request.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

use crate::error::surface::SurfaceError;
use crate::notification::model::{Geometry, Notification, WorkArea};

/// Windowing backend for notification surfaces.
///
/// Implementations own the real windows; [`SurfaceStack`](crate::notification::SurfaceStack)
/// owns ordering, geometry and animation and calls [`is_alive`](Self::is_alive)
/// before every mutation. A surface the environment destroyed on its own
/// should report `false` from then on.
pub trait SurfaceHost: Send {
    fn work_area(&self) -> WorkArea;

    /// Create a hidden surface at `bounds`.
    fn create(&mut self, id: &str, bounds: Geometry) -> Result<(), SurfaceError>;

    fn attach_content(&mut self, id: &str, notification: &Notification) -> Result<(), SurfaceError>;

    fn show(&mut self, id: &str) -> Result<(), SurfaceError>;

    /// `opacity` is in `0.0..=1.0`.
    fn set_opacity(&mut self, id: &str, opacity: f64) -> Result<(), SurfaceError>;

    fn set_bounds(&mut self, id: &str, bounds: Geometry) -> Result<(), SurfaceError>;

    fn close(&mut self, id: &str) -> Result<(), SurfaceError>;

    fn is_alive(&self, id: &str) -> bool;
}

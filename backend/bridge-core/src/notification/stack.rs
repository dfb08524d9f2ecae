use crate::config::LayoutConfig;
use crate::notification::host::SurfaceHost;
use crate::notification::model::{Geometry, Notification, SurfacePhase, SurfaceSnapshot};

use log::{debug, info, trace, warn};

struct Surface {
    notification: Notification,
    geometry: Geometry,
    phase: SurfacePhase,
    /// Opacity in steps, `0..=fade_steps`.
    level: u32,
}

/// Registry and layout of live notification surfaces.
///
/// Surfaces are kept in creation order, which is also their top-to-bottom
/// order on screen. Every surface's y offset is the top margin plus the sum of
/// `height + spacing` of the surfaces above it, and x is pinned to the right
/// edge of the work area.
///
/// Opacity is animated in whole steps by [`tick`](Self::tick); the caller owns
/// the clock. No method blocks or sleeps.
pub struct SurfaceStack<H: SurfaceHost> {
    host: H,
    layout: LayoutConfig,
    surfaces: Vec<Surface>,
}

impl<H: SurfaceHost> SurfaceStack<H> {
    pub fn new(host: H, layout: LayoutConfig) -> Self {
        Self {
            host,
            layout,
            surfaces: Vec::new(),
        }
    }

    /// Create a hidden surface for `notification` at the bottom of the stack.
    ///
    /// When the stack is full the oldest surface is closed first, without a
    /// fade. Returns `false` if the id is already live or the host failed to
    /// create the surface.
    pub fn show(&mut self, notification: Notification) -> bool {
        if self.position(&notification.id).is_some() {
            debug!("Notification {} already shown, ignoring", notification.id);
            return false;
        }

        let mut evicted = false;
        while self.surfaces.len() >= self.layout.max_visible {
            let oldest = self.surfaces.remove(0);
            info!(
                "Notification stack full ({}), evicting {}",
                self.layout.max_visible, oldest.notification.id
            );
            self.close_surface(&oldest.notification.id);
            evicted = true;
        }
        if evicted {
            self.reposition();
        }

        let height = self.layout.height_for(&notification.kind);
        let geometry = Geometry {
            x: self.column_x(),
            y: self.next_y(),
            width: self.layout.width,
            height,
        };

        if let Err(e) = self.host.create(&notification.id, geometry) {
            warn!("Failed to create surface for {}: {e}", notification.id);
            return false;
        }

        info!(
            "Notification {} ({}) created at {},{} {}x{}",
            notification.id, notification.kind, geometry.x, geometry.y, geometry.width, height
        );
        self.surfaces.push(Surface {
            notification,
            geometry,
            phase: SurfacePhase::PendingContent,
            level: 0,
        });
        true
    }

    /// The host can now render `id`: attach its content, show it and start the fade-in.
    pub fn content_ready(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            debug!("content_ready for unknown surface {id}");
            return false;
        };
        if self.surfaces[index].phase != SurfacePhase::PendingContent {
            return false;
        }
        if !self.host.is_alive(id) {
            self.forget(id);
            return false;
        }

        let notification = self.surfaces[index].notification.clone();
        let shown = self
            .host
            .attach_content(id, &notification)
            .and_then(|()| self.host.set_opacity(id, 0.0))
            .and_then(|()| self.host.show(id));

        if let Err(e) = shown {
            warn!("Failed to show surface {id}: {e}");
            self.close_surface(id);
            self.forget(id);
            return false;
        }

        let surface = &mut self.surfaces[index];
        surface.phase = SurfacePhase::Visible;
        surface.level = 0;
        true
    }

    /// Start fading `id` out. No-op if it is absent or already fading out.
    ///
    /// A surface that never received content has nothing to fade and is closed
    /// straight away.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            trace!("dismiss for unknown surface {id}");
            return false;
        };

        match self.surfaces[index].phase {
            SurfacePhase::FadingOut => false,
            SurfacePhase::PendingContent => {
                self.close_surface(id);
                self.forget(id);
                true
            }
            SurfacePhase::Visible => {
                debug!("Dismissing notification {id}");
                self.surfaces[index].phase = SurfacePhase::FadingOut;
                true
            }
        }
    }

    /// Dismiss every live surface. Returns how many started closing.
    pub fn dismiss_all(&mut self) -> usize {
        let mut dismissed = 0;
        for id in self.live_ids() {
            if self.dismiss(&id) {
                dismissed += 1;
            }
        }
        dismissed
    }

    /// The environment destroyed `id`; drop it and close the gap.
    pub fn surface_closed(&mut self, id: &str) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        debug!("Surface {id} closed externally");
        self.forget(id);
        true
    }

    /// Advance every animating surface by one opacity step.
    ///
    /// Returns whether anything is still animating afterwards.
    pub fn tick(&mut self) -> bool {
        let steps = self.layout.fade_steps;
        let mut finished = Vec::new();

        for surface in &mut self.surfaces {
            let id = surface.notification.id.as_str();
            let next = match surface.phase {
                SurfacePhase::Visible if surface.level < steps => surface.level + 1,
                SurfacePhase::FadingOut => surface.level.saturating_sub(1),
                _ => continue,
            };

            if !self.host.is_alive(id) {
                finished.push(id.to_string());
                continue;
            }

            surface.level = next;
            if let Err(e) = self.host.set_opacity(id, f64::from(next) / f64::from(steps)) {
                warn!("Opacity step failed for {id}, closing it: {e}");
                if let Err(e) = self.host.close(id) {
                    debug!("Close of surface {id} failed: {e}");
                }
                finished.push(id.to_string());
                continue;
            }

            if surface.phase == SurfacePhase::FadingOut && next == 0 {
                if let Err(e) = self.host.close(id) {
                    debug!("Close of faded surface {id} failed: {e}");
                }
                info!("Notification {id} closed");
                finished.push(id.to_string());
            }
        }

        if !finished.is_empty() {
            self.surfaces
                .retain(|surface| !finished.contains(&surface.notification.id));
            self.reposition();
        }

        self.is_animating()
    }

    /// Re-stack every live surface from the top margin with constant spacing.
    ///
    /// Surfaces the host no longer knows about are dropped first. A surface
    /// that cannot be moved is closed and dropped too, and the ones below it
    /// take its place.
    pub fn reposition(&mut self) {
        let x = self.column_x();
        let mut y = self.top();
        let spacing = self.layout.spacing;
        let host = &mut self.host;

        self.surfaces.retain_mut(|surface| {
            let id = surface.notification.id.as_str();
            if !host.is_alive(id) {
                debug!("Pruning destroyed surface {id}");
                return false;
            }

            let target = Geometry {
                x,
                y,
                ..surface.geometry
            };
            if target != surface.geometry {
                if let Err(e) = host.set_bounds(id, target) {
                    warn!("Failed to move surface {id}, closing it: {e}");
                    if let Err(e) = host.close(id) {
                        debug!("Close of surface {id} failed: {e}");
                    }
                    return false;
                }
                surface.geometry = target;
            }
            y = y.saturating_add_unsigned(surface.geometry.height + spacing);
            true
        });
    }

    /// Close every surface immediately, without fading.
    pub fn close_all(&mut self) {
        for surface in std::mem::take(&mut self.surfaces) {
            self.close_surface(&surface.notification.id);
        }
    }

    pub fn is_animating(&self) -> bool {
        let steps = self.layout.fade_steps;
        self.surfaces.iter().any(|surface| match surface.phase {
            SurfacePhase::Visible => surface.level < steps,
            SurfacePhase::FadingOut => true,
            SurfacePhase::PendingContent => false,
        })
    }

    /// Live ids in creation order (top to bottom).
    pub fn live_ids(&self) -> Vec<String> {
        self.surfaces
            .iter()
            .map(|surface| surface.notification.id.clone())
            .collect()
    }

    pub fn notification(&self, id: &str) -> Option<&Notification> {
        self.surface(id).map(|surface| &surface.notification)
    }

    pub fn geometry_of(&self, id: &str) -> Option<Geometry> {
        self.surface(id).map(|surface| surface.geometry)
    }

    pub fn phase_of(&self, id: &str) -> Option<SurfacePhase> {
        self.surface(id).map(|surface| surface.phase)
    }

    pub fn opacity_of(&self, id: &str) -> Option<f64> {
        self.surface(id).map(|surface| self.opacity(surface))
    }

    pub fn snapshot(&self) -> Vec<SurfaceSnapshot> {
        self.surfaces
            .iter()
            .map(|surface| SurfaceSnapshot {
                id: surface.notification.id.clone(),
                kind: surface.notification.kind.clone(),
                phase: surface.phase,
                opacity: self.opacity(surface),
                geometry: surface.geometry,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn surface(&self, id: &str) -> Option<&Surface> {
        self.surfaces
            .iter()
            .find(|surface| surface.notification.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.surfaces
            .iter()
            .position(|surface| surface.notification.id == id)
    }

    fn opacity(&self, surface: &Surface) -> f64 {
        f64::from(surface.level) / f64::from(self.layout.fade_steps)
    }

    fn forget(&mut self, id: &str) {
        self.surfaces
            .retain(|surface| surface.notification.id != id);
        self.reposition();
    }

    fn close_surface(&mut self, id: &str) {
        if !self.host.is_alive(id) {
            return;
        }
        if let Err(e) = self.host.close(id) {
            debug!("Close of surface {id} failed: {e}");
        }
    }

    fn top(&self) -> i32 {
        self.host
            .work_area()
            .y
            .saturating_add_unsigned(self.layout.margin_top)
    }

    fn column_x(&self) -> i32 {
        self.host
            .work_area()
            .right()
            .saturating_sub_unsigned(self.layout.margin_right + self.layout.width)
    }

    fn next_y(&self) -> i32 {
        self.surfaces.iter().fold(self.top(), |y, surface| {
            y.saturating_add_unsigned(surface.geometry.height + self.layout.spacing)
        })
    }
}

use crate::ecs::World;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Per-frame update handler. Systems run in registration order.
pub trait System {
    fn init(&mut self, _world: &mut World) {}
    fn update(&mut self, world: &mut World, delta_ms: u32);
    fn shutdown(&mut self, _world: &mut World) {}
}

/// Lets a system stay reachable from outside the scheduler. The scheduler
/// and the outside holder each keep a counted reference.
impl<S: System> System for Rc<RefCell<S>> {
    fn init(&mut self, world: &mut World) {
        self.borrow_mut().init(world);
    }

    fn update(&mut self, world: &mut World, delta_ms: u32) {
        self.borrow_mut().update(world, delta_ms);
    }

    fn shutdown(&mut self, world: &mut World) {
        self.borrow_mut().shutdown(world);
    }
}

#[derive(Debug, Clone)]
pub struct SystemProfile {
    pub name: &'static str,
    pub duration: Duration,
}

impl SystemProfile {
    pub fn duration_ms(&self) -> f32 {
        self.duration.as_secs_f64() as f32 * 1000.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameProfile {
    pub systems: Vec<SystemProfile>,
    pub total: Duration,
}

const SLOW_SYSTEM_THRESHOLD_MS: f32 = 4.0;

struct SystemEntry {
    name: &'static str,
    system: Box<dyn System>,
}

/// Owns the world and runs the registered systems.
pub struct Scheduler {
    world: World,
    systems: Vec<SystemEntry>,
    initialized: bool,
    last_profile: FrameProfile,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(World::default())
    }
}

impl Scheduler {
    pub fn new(world: World) -> Self {
        Self {
            world,
            systems: Vec::new(),
            initialized: false,
            last_profile: FrameProfile::default(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn last_profile(&self) -> &FrameProfile {
        &self.last_profile
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|entry| entry.name).collect()
    }

    pub fn add_system<S>(&mut self, name: &'static str, system: S)
    where
        S: System + 'static,
    {
        log::debug!("[scheduler] registered system {name}");
        self.systems.push(SystemEntry {
            name,
            system: Box::new(system),
        });
    }

    pub fn add_system_fn<F>(&mut self, name: &'static str, func: F)
    where
        F: FnMut(&mut World, u32) + 'static,
    {
        self.add_system(name, FnSystem { func });
    }

    pub fn init(&mut self) {
        for entry in &mut self.systems {
            entry.system.init(&mut self.world);
        }
        self.initialized = true;
        log::info!("[scheduler] initialised {} systems", self.systems.len());
    }

    pub fn update(&mut self, delta_ms: u32) {
        let frame_start = Instant::now();
        let mut profiles = Vec::with_capacity(self.systems.len());

        for entry in &mut self.systems {
            log::trace!("[scheduler] running system {}", entry.name);
            let start = Instant::now();
            entry.system.update(&mut self.world, delta_ms);
            let duration = start.elapsed();

            if duration.as_secs_f32() * 1000.0 > SLOW_SYSTEM_THRESHOLD_MS {
                log::warn!(
                    "[scheduler] system {} took {:.3} ms",
                    entry.name,
                    duration.as_secs_f64() * 1000.0
                );
            }
            profiles.push(SystemProfile {
                name: entry.name,
                duration,
            });
        }

        self.last_profile = FrameProfile {
            systems: profiles,
            total: frame_start.elapsed(),
        };
    }

    /// Shuts every system down in registration order, then drops them.
    pub fn shutdown(&mut self) {
        for entry in &mut self.systems {
            entry.system.shutdown(&mut self.world);
        }
        let released = self.systems.len();
        self.systems.clear();
        self.initialized = false;
        log::info!("[scheduler] shut down {released} systems");
    }
}

struct FnSystem<F: FnMut(&mut World, u32) + 'static> {
    func: F,
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut World, u32) + 'static,
{
    fn update(&mut self, world: &mut World, delta_ms: u32) {
        (self.func)(world, delta_ms);
    }
}

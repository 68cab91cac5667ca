//! Shared test fixtures.

use std::cell::RefCell;

use convplan::launch::LaunchSpec;
use convplan::error::{Error, Result};
use convplan::runtime::{KernelLauncher, LaunchArg};

/// One recorded launch.
#[derive(Debug, Clone)]
pub struct RecordedLaunch {
    pub kernel_name: &'static str,
    pub block: [u32; 3],
    pub grid: [u32; 3],
    pub args: Vec<LaunchArg>,
}

/// Launcher test double that records every launch instead of running it.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    launches: RefCell<Vec<RecordedLaunch>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<RecordedLaunch> {
        self.launches.borrow().clone()
    }
}

impl KernelLauncher for RecordingLauncher {
    fn launch(&self, spec: &LaunchSpec, args: &[LaunchArg]) -> Result<()> {
        self.launches.borrow_mut().push(RecordedLaunch {
            kernel_name: spec.kernel_name,
            block: spec.block,
            grid: spec.grid,
            args: args.to_vec(),
        });
        Ok(())
    }
}

/// Launcher double that fails when it reaches a designated kernel.
pub struct FailingLauncher {
    fail_on: &'static str,
    seen: RefCell<Vec<&'static str>>,
}

impl FailingLauncher {
    pub fn new(fail_on: &'static str) -> Self {
        Self {
            fail_on,
            seen: RefCell::new(Vec::new()),
        }
    }

    /// Kernel names seen so far, in launch order.
    pub fn seen(&self) -> Vec<&'static str> {
        self.seen.borrow().clone()
    }
}

impl KernelLauncher for FailingLauncher {
    fn launch(&self, spec: &LaunchSpec, _args: &[LaunchArg]) -> Result<()> {
        self.seen.borrow_mut().push(spec.kernel_name);
        if spec.kernel_name == self.fail_on {
            return Err(Error::launch(spec.kernel_name, "device lost"));
        }
        Ok(())
    }
}

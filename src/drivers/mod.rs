pub mod imu;
pub mod synthetic;

use crate::error::Result;
use crate::events::Sample;

/// Anything that can produce one 6-axis reading on demand.
pub trait SampleSource: Send {
    fn read(&mut self) -> Result<Sample>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read(&mut self) -> Result<Sample> {
        (**self).read()
    }
}

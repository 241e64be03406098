use crate::enums::PipelineState;
use crate::image::{Image, ImageInformation, Pixel};
use crate::pipeline::filter::ImageFilter;
use crate::region::Region;
use crate::time_stamp::TimeStamp;

use std::fmt;
use std::sync::Arc;

/// Handle of a stage inside one [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(pub(crate) usize);

impl StageId {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn output(self, output: usize) -> OutputRef {
        OutputRef { stage: self, output }
    }
}

/// One output of one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub stage: StageId,
    pub output: usize,
}

impl From<StageId> for OutputRef {
    fn from(stage: StageId) -> Self {
        stage.output(0)
    }
}

pub(crate) struct Stage<T: Pixel, const D: usize> {
    pub(crate) name: String,
    pub(crate) filter: Box<dyn ImageFilter<T, D>>,
    pub(crate) inputs: Vec<Option<OutputRef>>,
    pub(crate) outputs: Vec<Option<Arc<Image<T, D>>>>,
    /// Bumped whenever parameters or connections change.
    pub(crate) modified: TimeStamp,
    /// Newest modification anywhere upstream, refreshed by each data pass.
    pub(crate) pipeline_time: TimeStamp,
    pub(crate) last_executed: TimeStamp,
    pub(crate) execution_count: u64,
    /// Shared by every output; they are all produced by one execution.
    pub(crate) state: PipelineState,
    pub(crate) information: Option<ImageInformation<D>>,
    pub(crate) requested_region: Option<Region<D>>,
    /// Region of the current outputs that holds generated data.
    pub(crate) valid_region: Option<Region<D>>,
    pub(crate) boundary_clipped: bool,
}

impl<T: Pixel, const D: usize> Stage<T, D> {
    pub(crate) fn new(name: String, filter: Box<dyn ImageFilter<T, D>>) -> Self {
        let inputs = vec![None; filter.number_of_inputs()];
        let outputs = vec![None; filter.number_of_outputs()];
        Self {
            name,
            filter,
            inputs,
            outputs,
            modified: TimeStamp::now(),
            pipeline_time: TimeStamp::NEVER,
            last_executed: TimeStamp::NEVER,
            execution_count: 0,
            state: PipelineState::Unknown,
            information: None,
            requested_region: None,
            valid_region: None,
            boundary_clipped: false,
        }
    }

    pub(crate) fn modified(&mut self) {
        self.modified.modified();
        self.state = PipelineState::Unknown;
    }

    /// True when the current outputs cover `requested` and nothing upstream
    /// changed since they were produced.
    pub(crate) fn is_up_to_date(&self, requested: &Region<D>) -> bool {
        let covered = self
            .valid_region
            .is_some_and(|valid| requested.is_inside(&valid));
        self.outputs.iter().all(Option::is_some) && covered && self.pipeline_time <= self.last_executed
    }
}

impl<T: Pixel, const D: usize> fmt::Debug for Stage<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("state", &self.state)
            .field("modified", &self.modified)
            .field("last_executed", &self.last_executed)
            .field("execution_count", &self.execution_count)
            .finish()
    }
}

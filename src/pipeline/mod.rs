//! Demand-driven execution of a directed acyclic graph of image filters.
//!
//! An update of a stage runs three passes over the stage and everything
//! upstream of it:
//!
//! 1. **information**: output geometry flows downstream, sources first;
//! 2. **requested regions**: the region wanted from each stage flows
//!    upstream, each filter translating its output request into input
//!    requests;
//! 3. **data**: stages regenerate, sources first, but only when something
//!    upstream changed since their last execution or their current output
//!    does not cover the request.
//!
//! Each regeneration splits the requested region into partitions and runs
//! them on the worker pool, waiting for all of them before the next stage
//! starts.

pub mod error;
pub mod filter;
pub mod stage;

pub use error::{ErrorKind, FilterError, PipelineError};
pub use filter::{GenerateContext, ImageFilter};
pub use stage::{OutputRef, StageId};

use crate::config::PipelineConfig;
use crate::enums::{AllocationPolicy, PipelineState, Threading};
use crate::image::{Image, ImageInformation, ImageViewMut, Pixel};
use crate::region::Region;
use crate::splitter::RegionSplitter;
use crate::threader::{AbortHandle, MultiThreader, ProgressEvent, ProgressObserver, ProgressTracker};
use crate::time_stamp::TimeStamp;
use stage::Stage;

use log::{debug, trace, warn};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub struct Pipeline<T: Pixel, const D: usize> {
    stages: Vec<Stage<T, D>>,
    config: PipelineConfig,
    threader: MultiThreader,
    splitter: RegionSplitter,
    abort: AbortHandle,
    observer: Option<ProgressObserver>,
}

impl<T: Pixel, const D: usize> fmt::Debug for Pipeline<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("config", &self.config)
            .field("threader", &self.threader)
            .finish()
    }
}

impl<T: Pixel, const D: usize> Pipeline<T, D> {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let threader = MultiThreader::new(config.resolved_workers())?;
        debug!(
            "pipeline: {} workers, {:?}, {:?}, {:?}",
            threader.workers(),
            config.partitions,
            config.split_strategy,
            config.allocation
        );
        Ok(Self {
            stages: Vec::new(),
            splitter: RegionSplitter::new(config.split_strategy),
            config,
            threader,
            abort: AbortHandle::new(),
            observer: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn add_stage(&mut self, name: impl Into<String>, filter: impl ImageFilter<T, D>) -> StageId {
        let id = StageId(self.stages.len());
        self.stages.push(Stage::new(name.into(), Box::new(filter)));
        id
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn stage(&self, id: StageId) -> Result<&Stage<T, D>, PipelineError> {
        self.stages.get(id.0).ok_or(PipelineError::UnknownStage(id.0))
    }

    fn stage_mut(&mut self, id: StageId) -> Result<&mut Stage<T, D>, PipelineError> {
        self.stages.get_mut(id.0).ok_or(PipelineError::UnknownStage(id.0))
    }

    pub fn name(&self, id: StageId) -> Result<&str, PipelineError> {
        Ok(&self.stage(id)?.name)
    }

    /// Feeds `from` into input `slot` of `to`.
    ///
    /// The graph must stay acyclic: an edge that would let `to` reach itself
    /// through its inputs is rejected with [`PipelineError::Cycle`].
    pub fn connect(&mut self, from: impl Into<OutputRef>, to: StageId, slot: usize) -> Result<(), PipelineError> {
        let from = from.into();
        let producer = self.stage(from.stage)?;
        if from.output >= producer.outputs.len() {
            return Err(PipelineError::InvalidOutput {
                stage: producer.name.clone(),
                output: from.output,
            });
        }
        let consumer = self.stage(to)?;
        if slot >= consumer.inputs.len() {
            return Err(PipelineError::InvalidInputSlot {
                stage: consumer.name.clone(),
                slot,
                available: consumer.inputs.len(),
            });
        }
        if from.stage == to || self.is_upstream_of(to, from.stage) {
            return Err(PipelineError::Cycle {
                from: self.stage(from.stage)?.name.clone(),
                to: self.stage(to)?.name.clone(),
            });
        }
        let consumer = self.stage_mut(to)?;
        consumer.inputs[slot] = Some(from);
        consumer.modified();
        Ok(())
    }

    /// Removes the connection feeding input `slot` of `to`.
    pub fn disconnect(&mut self, to: StageId, slot: usize) -> Result<Option<OutputRef>, PipelineError> {
        let consumer = self.stage_mut(to)?;
        let available = consumer.inputs.len();
        let Some(input) = consumer.inputs.get_mut(slot) else {
            return Err(PipelineError::InvalidInputSlot {
                stage: consumer.name.clone(),
                slot,
                available,
            });
        };
        let previous = input.take();
        consumer.modified();
        Ok(previous)
    }

    /// True if `candidate` is reachable by walking upstream from `stage`.
    fn is_upstream_of(&self, candidate: StageId, stage: StageId) -> bool {
        let mut pending = vec![stage];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if current == candidate {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            pending.extend(self.stages[current.0].inputs.iter().flatten().map(|input| input.stage));
        }
        false
    }

    /// Mutates the parameters of a stage's filter and marks it modified.
    pub fn configure<F, R>(&mut self, id: StageId, f: impl FnOnce(&mut F) -> R) -> Result<R, PipelineError>
    where
        F: ImageFilter<T, D>,
    {
        let stage = self.stage_mut(id)?;
        let any: &mut dyn Any = &mut *stage.filter;
        let Some(filter) = any.downcast_mut::<F>() else {
            return Err(PipelineError::StageTypeMismatch {
                stage: stage.name.clone(),
            });
        };
        let result = f(filter);
        stage.modified();
        Ok(result)
    }

    /// Read access to a stage's filter.
    pub fn filter<F: ImageFilter<T, D>>(&self, id: StageId) -> Result<&F, PipelineError> {
        let stage = self.stage(id)?;
        let any: &dyn Any = &*stage.filter;
        any.downcast_ref::<F>().ok_or_else(|| PipelineError::StageTypeMismatch {
            stage: stage.name.clone(),
        })
    }

    /// Marks a stage modified without changing it, forcing regeneration of
    /// it and everything downstream on the next update.
    pub fn touch(&mut self, id: StageId) -> Result<(), PipelineError> {
        self.stage_mut(id)?.modified();
        Ok(())
    }

    pub fn state(&self, id: StageId) -> Result<PipelineState, PipelineError> {
        Ok(self.stage(id)?.state)
    }

    /// State of one output. Every output of a stage is produced by the same
    /// execution, so all of them report the stage's state.
    pub fn output_state(&self, output: impl Into<OutputRef>) -> Result<PipelineState, PipelineError> {
        let output = output.into();
        let stage = self.stage(output.stage)?;
        if output.output >= stage.outputs.len() {
            return Err(PipelineError::InvalidOutput {
                stage: stage.name.clone(),
                output: output.output,
            });
        }
        Ok(stage.state)
    }

    /// How many times the stage's filter has been executed.
    pub fn execution_count(&self, id: StageId) -> Result<u64, PipelineError> {
        Ok(self.stage(id)?.execution_count)
    }

    pub fn information(&self, id: StageId) -> Result<Option<ImageInformation<D>>, PipelineError> {
        Ok(self.stage(id)?.information)
    }

    pub fn requested_region(&self, id: StageId) -> Result<Option<Region<D>>, PipelineError> {
        Ok(self.stage(id)?.requested_region)
    }

    /// Whether the last negotiation cropped one of this stage's input
    /// requests at the input's largest possible region.
    pub fn boundary_clipped(&self, id: StageId) -> Result<bool, PipelineError> {
        Ok(self.stage(id)?.boundary_clipped)
    }

    /// Most recent data of an output, if it has been generated.
    pub fn output(&self, output: impl Into<OutputRef>) -> Result<Option<Arc<Image<T, D>>>, PipelineError> {
        let output = output.into();
        let stage = self.stage(output.stage)?;
        stage
            .outputs
            .get(output.output)
            .cloned()
            .ok_or_else(|| PipelineError::InvalidOutput {
                stage: stage.name.clone(),
                output: output.output,
            })
    }

    /// Handle that cancels an update from any thread. An abort requested
    /// while no update runs cancels the next one. The flag clears when an
    /// update ends.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn set_progress_observer(&mut self, observer: impl Fn(&ProgressEvent) + Send + Sync + 'static) {
        self.observer = Some(Arc::new(observer));
    }

    pub fn clear_progress_observer(&mut self) {
        self.observer = None;
    }

    /// Brings output 0 of `id` up to date over its largest possible region.
    pub fn update(&mut self, id: StageId) -> Result<Arc<Image<T, D>>, PipelineError> {
        self.update_with(id, None)
    }

    /// Brings output 0 of `id` up to date over `region`, which must lie
    /// inside the stage's largest possible region.
    pub fn update_region(&mut self, id: StageId, region: Region<D>) -> Result<Arc<Image<T, D>>, PipelineError> {
        self.update_with(id, Some(region))
    }

    fn update_with(&mut self, id: StageId, region: Option<Region<D>>) -> Result<Arc<Image<T, D>>, PipelineError> {
        let result = self.run_update(id, region);
        self.abort.reset();
        result
    }

    fn run_update(&mut self, id: StageId, region: Option<Region<D>>) -> Result<Arc<Image<T, D>>, PipelineError> {
        if self.abort.is_aborted() {
            let name = self.stage(id)?.name.clone();
            warn!("update of `{name}` aborted before it started");
            return Err(PipelineError::Aborted { stage: name });
        }
        self.update_output_information(id)?;
        self.propagate_requested_region(id, region)?;
        self.update_output_data(id)?;
        let stage = self.stage(id)?;
        stage
            .outputs
            .first()
            .cloned()
            .flatten()
            .ok_or_else(|| PipelineError::InvalidOutput {
                stage: stage.name.clone(),
                output: 0,
            })
    }

    /// Stages `id` depends on, producers before consumers, `id` last.
    fn upstream_order(&self, id: StageId) -> Result<Vec<StageId>, PipelineError> {
        self.stage(id)?;
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.visit_upstream(id, &mut visited, &mut order);
        Ok(order)
    }

    // Recursion depth is bounded because `connect` keeps the graph acyclic.
    fn visit_upstream(&self, id: StageId, visited: &mut HashSet<StageId>, order: &mut Vec<StageId>) {
        if !visited.insert(id) {
            return;
        }
        for input in self.stages[id.0].inputs.iter().flatten() {
            self.visit_upstream(input.stage, visited, order);
        }
        order.push(id);
    }

    fn wrap(&self, target: StageId, failed: StageId, error: PipelineError) -> PipelineError {
        if failed == target {
            error
        } else {
            PipelineError::upstream(&self.stages[target.0].name, &self.stages[failed.0].name, error)
        }
    }

    /// Information pass: refreshes the output geometry of `id` and all its
    /// upstream stages without touching pixel data.
    pub fn update_output_information(&mut self, id: StageId) -> Result<(), PipelineError> {
        for sid in self.upstream_order(id)? {
            self.stage_information(sid).map_err(|e| self.wrap(id, sid, e))?;
        }
        Ok(())
    }

    fn stage_information(&mut self, id: StageId) -> Result<(), PipelineError> {
        let stage = &self.stages[id.0];
        let mut inputs = Vec::with_capacity(stage.inputs.len());
        for (slot, input) in stage.inputs.iter().enumerate() {
            let Some(input) = input else {
                return Err(PipelineError::MissingInput {
                    stage: stage.name.clone(),
                    slot,
                });
            };
            let upstream = &self.stages[input.stage.0];
            let information = upstream.information.ok_or_else(|| PipelineError::InformationNotValid {
                stage: upstream.name.clone(),
            })?;
            inputs.push(information);
        }
        let information = stage
            .filter
            .generate_output_information(&inputs)
            .map_err(|source| PipelineError::Configuration {
                stage: stage.name.clone(),
                source,
            })?;

        let stage = &mut self.stages[id.0];
        stage.information = Some(information);
        stage.state = PipelineState::InformationValid;
        Ok(())
    }

    /// Requested-region pass. Sets the request of `id` to `region` (or its
    /// largest possible region) and translates it into requests on every
    /// upstream stage. Requests from several consumers of one producer are
    /// merged into their bounding box.
    pub fn propagate_requested_region(&mut self, id: StageId, region: Option<Region<D>>) -> Result<(), PipelineError> {
        let order = self.upstream_order(id)?;
        for sid in &order {
            let stage = &mut self.stages[sid.0];
            stage.requested_region = None;
            stage.boundary_clipped = false;
        }

        let target = &self.stages[id.0];
        let information = target.information.ok_or_else(|| PipelineError::InformationNotValid {
            stage: target.name.clone(),
        })?;
        let largest = information.largest_possible_region;
        let requested = match region {
            Some(region) if !region.is_inside(&largest) => {
                return Err(PipelineError::InvalidRequestedRegion {
                    stage: target.name.clone(),
                    requested: region.to_string(),
                    largest: largest.to_string(),
                });
            }
            Some(region) => region,
            None => largest,
        };
        self.stages[id.0].requested_region = Some(requested);

        // Consumers come before their producers in reverse post-order, so
        // every request on a stage is final before it is translated.
        for &sid in order.iter().rev() {
            self.negotiate_stage(sid).map_err(|e| self.wrap(id, sid, e))?;
        }
        Ok(())
    }

    fn negotiate_stage(&mut self, id: StageId) -> Result<(), PipelineError> {
        let stage = &self.stages[id.0];
        let information = stage.information.ok_or_else(|| PipelineError::InformationNotValid {
            stage: stage.name.clone(),
        })?;
        let Some(requested) = stage.requested_region else {
            return Err(PipelineError::RegionsNotNegotiated {
                stage: stage.name.clone(),
            });
        };
        let requested = stage
            .filter
            .enlarge_output_requested_region(&requested, &information)
            .crop(&information.largest_possible_region)
            .region;

        let mut requests = Vec::with_capacity(stage.inputs.len());
        let mut clipped = false;
        for (slot, input) in stage.inputs.iter().enumerate() {
            let Some(input) = input else {
                return Err(PipelineError::MissingInput {
                    stage: stage.name.clone(),
                    slot,
                });
            };
            let upstream = &self.stages[input.stage.0];
            let upstream_information = upstream.information.ok_or_else(|| PipelineError::InformationNotValid {
                stage: upstream.name.clone(),
            })?;
            let wanted = stage.filter.required_input_region(slot, &requested, &upstream_information);
            let cropped = wanted.crop(&upstream_information.largest_possible_region);
            if cropped.clipped {
                debug!(
                    "`{}` input {slot}: request {wanted} cropped to {} (boundary condition)",
                    stage.name, cropped.region
                );
                clipped = true;
            }
            requests.push((input.stage, cropped.region));
        }

        let stage = &mut self.stages[id.0];
        stage.requested_region = Some(requested);
        stage.boundary_clipped = clipped;
        stage.state = PipelineState::RegionsNegotiated;
        for (upstream, region) in requests {
            let upstream = &mut self.stages[upstream.0];
            upstream.requested_region = Some(match upstream.requested_region {
                Some(existing) => existing.bounding_union(&region),
                None => region,
            });
        }
        Ok(())
    }

    /// Data pass: regenerates `id` and its upstream stages where needed,
    /// producers first.
    pub fn update_output_data(&mut self, id: StageId) -> Result<(), PipelineError> {
        for sid in self.upstream_order(id)? {
            self.stage_data(sid).map_err(|e| self.wrap(id, sid, e))?;
        }
        Ok(())
    }

    fn stage_data(&mut self, id: StageId) -> Result<(), PipelineError> {
        let stage = &self.stages[id.0];
        let Some(requested) = stage.requested_region else {
            return Err(PipelineError::RegionsNotNegotiated {
                stage: stage.name.clone(),
            });
        };

        let mut pipeline_time = stage.modified;
        let mut inputs = Vec::with_capacity(stage.inputs.len());
        for (slot, input) in stage.inputs.iter().enumerate() {
            let Some(input) = input else {
                return Err(PipelineError::MissingInput {
                    stage: stage.name.clone(),
                    slot,
                });
            };
            let upstream = &self.stages[input.stage.0];
            pipeline_time = pipeline_time.max(upstream.pipeline_time);
            let image = upstream
                .outputs
                .get(input.output)
                .cloned()
                .flatten()
                .ok_or_else(|| PipelineError::Execution {
                    stage: upstream.name.clone(),
                    source: FilterError::MissingInput(slot),
                })?;
            inputs.push(image);
        }

        let stage = &mut self.stages[id.0];
        stage.pipeline_time = pipeline_time;
        if stage.is_up_to_date(&requested) {
            debug!("`{}` is up to date for {requested}, reusing output", stage.name);
            stage.state = PipelineState::DataValid;
            return Ok(());
        }

        let result = self.execute_stage(id, requested, &inputs);
        let stage = &mut self.stages[id.0];
        match result {
            Ok(outputs) => {
                stage.outputs = outputs.into_iter().map(|o| Some(Arc::new(o))).collect();
                stage.valid_region = Some(requested);
                stage.last_executed = TimeStamp::now();
                stage.execution_count += 1;
                stage.state = PipelineState::DataValid;
                Ok(())
            }
            Err(error) => {
                stage.state = PipelineState::Unknown;
                Err(error)
            }
        }
    }

    /// Allocates fresh outputs for `id` and runs its filter over the
    /// partitions of `requested`, each writing through its own view.
    fn execute_stage(
        &mut self,
        id: StageId,
        requested: Region<D>,
        inputs: &[Arc<Image<T, D>>],
    ) -> Result<Vec<Image<T, D>>, PipelineError> {
        let Self {
            stages,
            config,
            threader,
            splitter,
            abort,
            observer,
        } = self;
        let stage = &mut stages[id.0];
        let name = stage.name.clone();
        let information = stage
            .information
            .ok_or_else(|| PipelineError::InformationNotValid { stage: name.clone() })?;

        let buffered = match config.allocation {
            AllocationPolicy::RequestedRegion => requested,
            AllocationPolicy::LargestPossibleRegion => information.largest_possible_region,
        };
        let mut outputs = (0..stage.outputs.len())
            .map(|_| Image::allocate(information, buffered))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| PipelineError::Allocation {
                stage: name.clone(),
                source,
            })?;

        let threading = stage.filter.threading();
        let pieces = match threading {
            Threading::SingleThreaded => 1,
            Threading::Parallel => config.partitions.pieces(threader.workers()),
        };
        let partitions = splitter.split(&requested, pieces);
        debug!(
            "executing `{name}` over {requested} in {} partition(s), buffered {buffered}",
            partitions.len()
        );

        let tracker = ProgressTracker::new(name.clone(), requested.number_of_pixels() as u64, observer.clone());
        let ctx = GenerateContext::new(&name, inputs, requested, &information, abort);
        stage
            .filter
            .before_generate(&ctx)
            .map_err(|e| PipelineError::from_filter(&name, e))?;

        let filter: &dyn ImageFilter<T, D> = &*stage.filter;
        let mut work: Vec<(Region<D>, Vec<ImageViewMut<'_, T, D>>)> = partitions
            .iter()
            .map(|region| (*region, Vec::with_capacity(outputs.len())))
            .collect();
        for output in outputs.iter_mut() {
            let views = output
                .partition_views(&partitions)
                .map_err(|e| PipelineError::from_filter(&name, e.into()))?;
            for ((_, slot), view) in work.iter_mut().zip(views) {
                slot.push(view);
            }
        }
        threader
            .execute(threading, work, |i, (region, mut views)| -> Result<(), FilterError> {
                ctx.check_abort()?;
                filter.generate(&ctx, &region, &mut views)?;
                tracker.add(region.number_of_pixels() as u64);
                trace!("`{name}` partition {i} {region} done");
                Ok(())
            })
            .map_err(|e| {
                if matches!(e, FilterError::Aborted) {
                    warn!("`{name}` aborted after {} of {} pixels", tracker.completed(), tracker.total());
                }
                PipelineError::from_filter(&name, e)
            })?;

        stage
            .filter
            .after_generate(&ctx)
            .map_err(|e| PipelineError::from_filter(&name, e))?;

        for output in &mut outputs {
            output.set_requested_region(requested);
            output.modified();
        }
        Ok(outputs)
    }
}

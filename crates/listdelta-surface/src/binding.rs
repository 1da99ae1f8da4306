#![forbid(unsafe_code)]

//! Presentation adapter: drives a [`RenderSurface`] from change batches.
//!
//! The binding owns the aggregator and the surface. It receives change
//! notifications through [`ChangeObserver`], and on `end_batch` either asks
//! the surface to reload everything or hands it the batch plan. Once the
//! surface reports that the transaction settled, every reconfigure-list
//! item that is still on screen is passed to the configure callback.

use listdelta_core::{
    AggregatorConfig, BatchOutcome, BatchTicket, ChangeEvent, ChangeObserver, ChangeSetAggregator,
    ItemIndex, ItemUpdateMode, SequenceError,
};
use tracing::{debug, trace};

use crate::source::{BindError, FetchSource};
use crate::surface::{Completion, RenderSurface};

/// Callback that refreshes an on-screen element in place.
pub type ConfigureItem<E> = Box<dyn FnMut(&mut E, ItemIndex)>;

/// Builder for [`SurfaceBinding`].
pub struct BindingBuilder<R: RenderSurface> {
    surface: R,
    config: AggregatorConfig,
    configure: Option<ConfigureItem<R::Element>>,
}

impl<R: RenderSurface> BindingBuilder<R> {
    /// Replace the aggregator configuration.
    ///
    /// The item update mode is derived from whether a configure callback is
    /// installed, so only `force_reload` is taken from here.
    #[must_use]
    pub fn config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Install a configure callback. Updated items are then refreshed in
    /// place after each batch instead of being reloaded.
    #[must_use]
    pub fn configure_item(mut self, f: impl FnMut(&mut R::Element, ItemIndex) + 'static) -> Self {
        self.configure = Some(Box::new(f));
        self
    }

    /// Build without fetching. The surface is not touched.
    #[must_use]
    pub fn build(self) -> SurfaceBinding<R> {
        let mode = if self.configure.is_some() {
            ItemUpdateMode::Reconfigure
        } else {
            ItemUpdateMode::Reload
        };
        SurfaceBinding {
            aggregator: ChangeSetAggregator::new(self.config.with_item_updates(mode)),
            surface: self.surface,
            configure: self.configure,
            in_flight: None,
        }
    }

    /// Run the initial fetch, then reload the surface.
    ///
    /// On fetch failure the surface is dropped untouched.
    pub fn bind<S>(self, source: &mut S) -> Result<SurfaceBinding<R>, BindError>
    where
        S: FetchSource + ?Sized,
    {
        source.perform_fetch()?;
        let mut binding = self.build();
        binding.surface.reload_all();
        debug!("listdelta surface bound");
        Ok(binding)
    }
}

/// Aggregator plus surface plus optional configure callback.
pub struct SurfaceBinding<R: RenderSurface> {
    aggregator: ChangeSetAggregator,
    surface: R,
    configure: Option<ConfigureItem<R::Element>>,
    in_flight: Option<BatchTicket>,
}

impl<R: RenderSurface> SurfaceBinding<R> {
    pub fn builder(surface: R) -> BindingBuilder<R> {
        BindingBuilder {
            surface,
            config: AggregatorConfig::default(),
            configure: None,
        }
    }

    /// Fetch from `source` and reload `surface`, with an optional configure
    /// callback and the default configuration.
    pub fn bind<S>(
        source: &mut S,
        surface: R,
        configure: Option<ConfigureItem<R::Element>>,
    ) -> Result<Self, BindError>
    where
        S: FetchSource + ?Sized,
    {
        let builder = BindingBuilder {
            surface,
            config: AggregatorConfig::default(),
            configure,
        };
        builder.bind(source)
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut R {
        &mut self.surface
    }

    pub fn into_surface(self) -> R {
        self.surface
    }

    pub fn aggregator(&self) -> &ChangeSetAggregator {
        &self.aggregator
    }

    /// Whether a batch was handed to the surface and has not settled yet.
    pub fn is_applying(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Report that a deferred transaction settled.
    ///
    /// # Panics
    ///
    /// Panics if no batch is waiting for completion.
    pub fn batch_completed(&mut self, finished: bool) {
        if let Err(err) = self.try_batch_completed(finished) {
            panic!("{err}");
        }
    }

    /// Like [`batch_completed`](Self::batch_completed), returning the number
    /// of elements that were reconfigured.
    pub fn try_batch_completed(&mut self, finished: bool) -> Result<usize, SequenceError> {
        let ticket = self.in_flight.take().ok_or(SequenceError::NotApplying {
            phase: self.aggregator.phase(),
        })?;
        self.settle(ticket, finished)
    }

    /// Non-panicking `begin_batch`.
    pub fn try_begin_batch(&mut self) -> Result<(), BindError> {
        Ok(self.aggregator.try_begin_batch()?)
    }

    /// Non-panicking `on_event`.
    pub fn try_on_event(&mut self, event: ChangeEvent) -> Result<(), BindError> {
        Ok(self.aggregator.try_handle(event)?)
    }

    /// Non-panicking `end_batch`.
    pub fn try_end_batch(&mut self) -> Result<(), BindError> {
        let outcome = self.aggregator.try_end_batch()?;
        self.dispatch(outcome)?;
        Ok(())
    }

    fn dispatch(&mut self, outcome: BatchOutcome) -> Result<(), SequenceError> {
        match outcome {
            BatchOutcome::ReloadAll => {
                self.surface.reload_all();
                Ok(())
            }
            BatchOutcome::Batch { plan, ticket } => match self.surface.apply_batch(&plan) {
                Completion::Settled { finished } => self.settle(ticket, finished).map(|_| ()),
                Completion::Deferred => {
                    trace!(epoch = ticket.epoch(), "listdelta batch deferred");
                    self.in_flight = Some(ticket);
                    Ok(())
                }
            },
        }
    }

    fn settle(&mut self, ticket: BatchTicket, finished: bool) -> Result<usize, SequenceError> {
        let reconfigure = self.aggregator.try_complete_batch(ticket, finished)?;
        let Some(configure) = self.configure.as_mut() else {
            return Ok(0);
        };

        let mut configured = 0usize;
        for index in &reconfigure {
            if let Some(element) = self.surface.element_mut(*index) {
                configure(element, *index);
                configured += 1;
            }
        }
        if configured < reconfigure.len() {
            debug!(
                configured,
                offscreen = reconfigure.len() - configured,
                "skipped reconfigure for off-screen items"
            );
        }
        Ok(configured)
    }
}

impl<R: RenderSurface> ChangeObserver for SurfaceBinding<R> {
    fn begin_batch(&mut self) {
        if let Err(err) = self.try_begin_batch() {
            panic!("{err}");
        }
    }

    fn on_event(&mut self, event: ChangeEvent) {
        if let Err(err) = self.try_on_event(event) {
            panic!("{err}");
        }
    }

    fn end_batch(&mut self) {
        if let Err(err) = self.try_end_batch() {
            panic!("{err}");
        }
    }
}

impl<R: RenderSurface + std::fmt::Debug> std::fmt::Debug for SurfaceBinding<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceBinding")
            .field("aggregator", &self.aggregator)
            .field("surface", &self.surface)
            .field("configure", &self.configure.is_some())
            .field("in_flight", &self.in_flight.as_ref().map(BatchTicket::epoch))
            .finish()
    }
}

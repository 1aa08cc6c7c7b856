//! Render targets: the thing a [`RenderScheduler`](crate::scheduler::RenderScheduler)
//! hands each adjustment value to.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tonal_core::transform::params::AdjustmentParameters;

use crate::compositor::Compositor;
use crate::error::RenderError;
use crate::plan::{LutCache, RenderPlan};

/// Produces one rendered frame for an adjustment value.
pub trait RenderTarget: Send + Sync + 'static {
    fn render(&self, params: AdjustmentParameters) -> BoxFuture<'static, Result<(), RenderError>>;
}

/// Adapts an async closure into a [`RenderTarget`].
pub struct RenderFn<F>(pub F);

impl<F, Fut> RenderTarget for RenderFn<F>
where
    F: Fn(AdjustmentParameters) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), RenderError>> + Send + 'static,
{
    fn render(&self, params: AdjustmentParameters) -> BoxFuture<'static, Result<(), RenderError>> {
        (self.0)(params).boxed()
    }
}

type Sink<B> = Arc<dyn Fn(B) + Send + Sync>;

/// Renders through a [`Compositor`] and hands each finished buffer to a sink.
///
/// Plans run on the blocking pool since compositor calls may be slow.
pub struct CompositorRenderer<C: Compositor> {
    compositor: Arc<C>,
    cube_dimension: u32,
    sink: Sink<C::Buffer>,
    luts: Arc<LutCache>,
}

impl<C: Compositor> CompositorRenderer<C> {
    pub fn new(
        compositor: Arc<C>,
        cube_dimension: u32,
        sink: impl Fn(C::Buffer) + Send + Sync + 'static,
    ) -> Self {
        Self {
            compositor,
            cube_dimension: cube_dimension.max(2),
            sink: Arc::new(sink),
            luts: Arc::new(LutCache::new()),
        }
    }

    pub fn compositor(&self) -> &Arc<C> {
        &self.compositor
    }

    /// Forget the cached external LUT so the next render reloads it from disk.
    pub fn reload_luts(&self) {
        self.luts.invalidate();
    }

    /// Render synchronously on the calling thread.
    pub fn render_now(&self, params: &AdjustmentParameters) -> Result<C::Buffer, RenderError> {
        RenderPlan::build(params, self.cube_dimension).execute(self.compositor.as_ref(), &self.luts)
    }
}

impl<C: Compositor> RenderTarget for CompositorRenderer<C> {
    fn render(&self, params: AdjustmentParameters) -> BoxFuture<'static, Result<(), RenderError>> {
        let compositor = Arc::clone(&self.compositor);
        let sink = Arc::clone(&self.sink);
        let luts = Arc::clone(&self.luts);
        let dimension = self.cube_dimension;
        async move {
            let buffer = tokio::task::spawn_blocking(move || {
                RenderPlan::build(&params, dimension).execute(compositor.as_ref(), &luts)
            })
            .await??;
            sink(buffer);
            Ok(())
        }
        .boxed()
    }
}

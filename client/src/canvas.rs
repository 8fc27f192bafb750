use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, PointerEvent, WheelEvent};

use crate::app::{
    CameraCommands, CurrentViewMode, HighlightSpecies, Hovered, MapData, Selected,
    SelectionPoint, save_camera,
};
use crate::config::MapConfig;
use crate::controller::{MapController, MapEvent, ViewState};
use crate::gpu::GpuRenderer;
use crate::render_loop::RenderScheduler;
use crate::renderer::Renderer;
use crate::renderer::canvas2d::CanvasSurface;
use crate::viewport::Camera;

/// Imperative camera operations requested by the surrounding UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCommand {
    ZoomBy(f64),
    ResetZoom,
    Restore(Camera),
}

struct ResizeBinding {
    window: web_sys::Window,
    handler: Closure<dyn Fn()>,
    scheduler: Rc<RenderScheduler>,
}

impl Drop for ResizeBinding {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback("resize", self.handler.as_ref().unchecked_ref());
    }
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

pub fn render_scale() -> f64 {
    web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .unwrap_or(1.0)
        .max(1.0)
}

/// Pointer position relative to the map's top-left corner.
fn local_point(canvas: &NodeRef<leptos::html::Canvas>, client_x: f64, client_y: f64) -> (f64, f64) {
    canvas
        .get_untracked()
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (client_x - rect.left(), client_y - rect.top())
        })
        .unwrap_or((client_x, client_y))
}

/// Two-canvas map view: wgpu terrain underneath, Canvas 2D overlays on top.
/// Without a GPU the overlay canvas draws every layer.
#[component]
pub fn MapCanvas() -> impl IntoView {
    let config: MapConfig = expect_context();
    let MapData(map_data) = expect_context();
    let CurrentViewMode(view_mode) = expect_context();
    let HighlightSpecies(species) = expect_context();
    let Selected(selected) = expect_context();
    let Hovered(hovered) = expect_context();
    let SelectionPoint(selection_point) = expect_context();
    let CameraCommands(camera_commands) = expect_context();

    let gpu_canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let overlay_ref = NodeRef::<leptos::html::Canvas>::new();

    let controller = Rc::new(RefCell::new(MapController::new(config.clone())));
    let renderer = Rc::new(RefCell::new(Renderer::new(config.render_strategy)));
    let gpu: Rc<RefCell<Option<GpuRenderer>>> = Rc::new(RefCell::new(None));
    let gpu_needs_upload = Rc::new(Cell::new(false));
    let gpu_init_started = Rc::new(Cell::new(false));
    let overlay_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));
    let last_saved: Rc<Cell<Option<Camera>>> = Rc::new(Cell::new(None));

    let scheduler = RenderScheduler::new({
        let controller = controller.clone();
        let renderer = renderer.clone();
        let gpu = gpu.clone();
        let gpu_needs_upload = gpu_needs_upload.clone();
        let overlay_ctx = overlay_ctx.clone();
        move |now| {
            let (Some(gpu_canvas), Some(overlay)) =
                (gpu_canvas_ref.get_untracked(), overlay_ref.get_untracked())
            else {
                return false;
            };
            let gpu_canvas: &HtmlCanvasElement = &gpu_canvas;
            let overlay: &HtmlCanvasElement = &overlay;

            let Some(parent) = gpu_canvas.parent_element() else {
                return false;
            };
            let w = parent.client_width() as u32;
            let h = parent.client_height() as u32;
            if w == 0 || h == 0 {
                return false;
            }
            let dpr = render_scale();
            let pw = (w as f64 * dpr).round().max(1.0) as u32;
            let ph = (h as f64 * dpr).round().max(1.0) as u32;
            if gpu_canvas.width() != pw || gpu_canvas.height() != ph {
                gpu_canvas.set_width(pw);
                gpu_canvas.set_height(ph);
                overlay.set_width(pw);
                overlay.set_height(ph);
                // Canvas resize resets 2D context state.
                *overlay_ctx.borrow_mut() = None;
                if let Some(ref mut gpu) = *gpu.borrow_mut() {
                    gpu.resize(pw, ph, dpr as f32);
                }
            }

            let mut ctrl = controller.borrow_mut();
            ctrl.resize(w as f64, h as f64);
            let coasting = ctrl.frame(now);
            ctrl.take_redraw();
            let ctrl = &*ctrl;

            let view = ViewState {
                view_mode: view_mode.get_untracked(),
                species: species.get_untracked(),
                selected: selected.get_untracked(),
            };
            let mut frame = ctrl.frame_input(&view, now);
            let mut renderer = renderer.borrow_mut();
            let outcome = renderer.prepare(&frame);

            if let (Some(gpu), Some(pool)) = (gpu.borrow_mut().as_mut(), renderer.sprite_pool()) {
                if outcome.fills_changed() || gpu_needs_upload.replace(false) {
                    gpu.upload(pool, &ctrl.layout().metrics);
                }
                gpu.render(ctrl.camera(), ctrl.layout().world_width);
                frame.skip_terrain = true;
            }

            let ctx = {
                let mut cache = overlay_ctx.borrow_mut();
                if cache.is_none() {
                    *cache = overlay
                        .get_context("2d")
                        .ok()
                        .flatten()
                        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok());
                }
                let Some(ctx) = cache.clone() else {
                    return false;
                };
                ctx
            };
            let mut surface = CanvasSurface::new(&ctx, dpr);
            let animating = renderer.render(&mut surface, &frame);

            if ctrl.is_initialized() && !ctrl.is_panning() {
                let camera = ctrl.camera_state();
                if last_saved.get() != Some(camera) {
                    last_saved.set(Some(camera));
                    save_camera(&camera);
                }
            }

            coasting || animating
        }
    });
    let scheduler = Rc::new(scheduler);

    // Initialize GPU renderer asynchronously (retained strategy only).
    Effect::new({
        let gpu = gpu.clone();
        let gpu_needs_upload = gpu_needs_upload.clone();
        let scheduler = scheduler.clone();
        let wants_gpu = renderer.borrow().sprite_pool().is_some();
        move || {
            if !wants_gpu || gpu_init_started.get() {
                return;
            }
            let Some(canvas_el) = gpu_canvas_ref.get() else {
                return;
            };
            gpu_init_started.set(true);

            let canvas: &HtmlCanvasElement = &canvas_el;
            let canvas: HtmlCanvasElement = canvas.clone();
            let gpu = gpu.clone();
            let gpu_needs_upload = gpu_needs_upload.clone();
            let scheduler = scheduler.clone();

            wasm_bindgen_futures::spawn_local(async move {
                match GpuRenderer::init(canvas).await {
                    Ok(renderer) => {
                        *gpu.borrow_mut() = Some(renderer);
                        gpu_needs_upload.set(true);
                        scheduler.mark_dirty();
                    }
                    Err(e) => {
                        tracing::warn!("wgpu init failed, using Canvas 2D fallback: {e}");
                    }
                }
            });
        }
    });

    // New map snapshot: full replacement.
    Effect::new({
        let controller = controller.clone();
        let scheduler = scheduler.clone();
        move || {
            let map = map_data.get();
            let still_hovered = {
                let mut ctrl = controller.borrow_mut();
                ctrl.set_map(map);
                ctrl.hovered()
            };
            if hovered.get_untracked() != still_hovered {
                hovered.set(still_hovered);
            }
            scheduler.mark_dirty();
        }
    });

    // Appearance inputs.
    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            view_mode.track();
            species.track();
            selected.track();
            scheduler.mark_dirty();
        }
    });

    // Camera handle.
    Effect::new({
        let controller = controller.clone();
        let scheduler = scheduler.clone();
        move || {
            camera_commands.track();
            let pending = camera_commands
                .try_update_untracked(std::mem::take)
                .unwrap_or_default();
            if pending.is_empty() {
                return;
            }
            let mut ctrl = controller.borrow_mut();
            for command in pending {
                match command {
                    CameraCommand::ZoomBy(delta) => ctrl.zoom_by(delta),
                    CameraCommand::ResetZoom => ctrl.reset_zoom(),
                    CameraCommand::Restore(camera) => ctrl.set_camera_state(camera),
                }
            }
            if ctrl.take_redraw() {
                scheduler.mark_dirty();
            }
        }
    });

    // Window resize triggers a one-shot resync on the next frame.
    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            let Some(window) = web_sys::window() else {
                return;
            };
            RESIZE_BINDING.with(|slot| slot.borrow_mut().take());
            let handler = Closure::<dyn Fn()>::new({
                let scheduler = scheduler.clone();
                move || scheduler.mark_dirty()
            });
            if window
                .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
                .is_ok()
            {
                RESIZE_BINDING.with(|slot| {
                    *slot.borrow_mut() = Some(ResizeBinding {
                        window: window.clone(),
                        handler,
                        scheduler: scheduler.clone(),
                    });
                });
            }
        }
    });

    // Unmount: stop pending frames and release the listener's scheduler handle.
    on_cleanup(|| {
        let binding = RESIZE_BINDING.with(|slot| slot.borrow_mut().take());
        if let Some(binding) = binding {
            binding.scheduler.cancel();
        }
    });

    // --- Input handlers ---

    let dispatch = move |event: Option<MapEvent>| match event {
        Some(MapEvent::SelectTile { tile_id, screen }) => {
            selection_point.set(screen);
            selected.set(Some(tile_id));
        }
        Some(MapEvent::HoverChanged(id)) => hovered.set(id),
        None => {}
    };

    let request_redraw = {
        let controller = controller.clone();
        let scheduler = scheduler.clone();
        move || {
            let redraw = controller.borrow_mut().take_redraw();
            if redraw {
                scheduler.mark_dirty();
            }
        }
    };

    let on_wheel = {
        let controller = controller.clone();
        let request_redraw = request_redraw.clone();
        move |e: WheelEvent| {
            e.prevent_default();
            let (x, y) = local_point(&gpu_canvas_ref, e.client_x() as f64, e.client_y() as f64);
            controller.borrow_mut().wheel(e.delta_y(), x, y);
            request_redraw();
        }
    };

    let on_pointer_down = {
        let controller = controller.clone();
        let request_redraw = request_redraw.clone();
        move |e: PointerEvent| {
            let (x, y) = local_point(&gpu_canvas_ref, e.client_x() as f64, e.client_y() as f64);
            controller.borrow_mut().pointer_down(x, y, e.time_stamp());
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
            request_redraw();
        }
    };

    let on_pointer_move = {
        let controller = controller.clone();
        let request_redraw = request_redraw.clone();
        move |e: PointerEvent| {
            let (x, y) = local_point(&gpu_canvas_ref, e.client_x() as f64, e.client_y() as f64);
            let event = controller.borrow_mut().pointer_move(x, y, e.time_stamp());
            dispatch(event);
            request_redraw();
        }
    };

    let on_pointer_up = {
        let controller = controller.clone();
        let request_redraw = request_redraw.clone();
        move |e: PointerEvent| {
            let (x, y) = local_point(&gpu_canvas_ref, e.client_x() as f64, e.client_y() as f64);
            let event = controller.borrow_mut().pointer_up(x, y, e.time_stamp());
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
            dispatch(event);
            request_redraw();
        }
    };

    let on_pointer_leave = {
        let controller = controller.clone();
        move |e: PointerEvent| {
            let event = controller.borrow_mut().pointer_leave(e.time_stamp());
            dispatch(event);
            request_redraw();
        }
    };

    view! {
        <div
            style="position: relative; width: 100%; height: 100%; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
        >
            <canvas
                node_ref=gpu_canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
            <canvas
                node_ref=overlay_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; pointer-events: none;"
            />
        </div>
    }
}

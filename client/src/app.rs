use std::cell::RefCell;
use std::sync::Arc;

use gloo_storage::Storage;
use hexworld_shared::{MapOverview, TileId};
use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::canvas::{CameraCommand, MapCanvas};
use crate::colors::rgb_css;
use crate::config::MapConfig;
use crate::data;
use crate::renderer::{ViewMode, tile_fill};
use crate::viewport::Camera;

const SETTINGS_STORAGE_KEY: &str = "hexworld_settings";
const CAMERA_STORAGE_KEY: &str = "hexworld_camera";
const ZOOM_STEP: f64 = 0.2;

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
}

/// Newtype wrappers give the map's signals distinct types for Leptos context.
#[derive(Clone, Copy)]
pub(crate) struct MapData(pub RwSignal<Arc<MapOverview>>);
#[derive(Clone, Copy)]
pub(crate) struct CurrentViewMode(pub RwSignal<ViewMode>);
#[derive(Clone, Copy)]
pub(crate) struct HighlightSpecies(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<TileId>>);
#[derive(Clone, Copy)]
pub(crate) struct Selected(pub RwSignal<Option<TileId>>);
/// Screen point of the click that produced the current selection.
#[derive(Clone, Copy)]
pub(crate) struct SelectionPoint(pub RwSignal<(f64, f64)>);
#[derive(Clone, Copy)]
pub(crate) struct CameraCommands(pub RwSignal<Vec<CameraCommand>>);

#[derive(Clone, Debug, PartialEq)]
enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

#[derive(serde::Serialize, serde::Deserialize, Default)]
#[serde(default)]
struct Settings {
    view_mode: ViewMode,
    species: Option<String>,
}

fn load_camera() -> Option<Camera> {
    gloo_storage::LocalStorage::get::<Camera>(CAMERA_STORAGE_KEY).ok()
}

pub(crate) fn save_camera(camera: &Camera) {
    if let Err(e) = gloo_storage::LocalStorage::set(CAMERA_STORAGE_KEY, camera) {
        tracing::debug!("camera not persisted: {e}");
    }
}

fn request_map(url: String, map: RwSignal<Arc<MapOverview>>, state: RwSignal<LoadState>) {
    state.set(LoadState::Loading);
    wasm_bindgen_futures::spawn_local(async move {
        match data::fetch_map_overview(&url).await {
            Ok(overview) => {
                map.set(Arc::new(overview));
                state.set(LoadState::Ready);
            }
            Err(e) => {
                // Keep whatever map is already on screen.
                tracing::warn!(%url, "map overview fetch failed: {e}");
                state.set(LoadState::Failed(e));
            }
        }
    });
}

/// Root application component. Provides global reactive signals via context.
#[component]
pub fn App() -> impl IntoView {
    let config = MapConfig::load();
    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_STORAGE_KEY).unwrap_or_default();

    let map: RwSignal<Arc<MapOverview>> = RwSignal::new(Arc::new(MapOverview::default()));
    let view_mode: RwSignal<ViewMode> = RwSignal::new(saved.view_mode);
    let species: RwSignal<Option<String>> = RwSignal::new(saved.species);
    let hovered: RwSignal<Option<TileId>> = RwSignal::new(None);
    let selected: RwSignal<Option<TileId>> = RwSignal::new(None);
    let selection_point: RwSignal<(f64, f64)> = RwSignal::new((0.0, 0.0));
    // A saved camera is restored once the first map is laid out.
    let camera_commands: RwSignal<Vec<CameraCommand>> =
        RwSignal::new(load_camera().map(CameraCommand::Restore).into_iter().collect());
    let load_state: RwSignal<LoadState> = RwSignal::new(LoadState::Loading);

    provide_context(config.clone());
    provide_context(MapData(map));
    provide_context(CurrentViewMode(view_mode));
    provide_context(HighlightSpecies(species));
    provide_context(Hovered(hovered));
    provide_context(Selected(selected));
    provide_context(SelectionPoint(selection_point));
    provide_context(CameraCommands(camera_commands));
    provide_context(load_state);

    request_map(config.data_url.clone(), map, load_state);

    Effect::new(move || {
        let settings = Settings {
            view_mode: view_mode.get(),
            species: species.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_STORAGE_KEY, &settings);
    });

    // A replaced map may no longer contain the selected tile or species.
    Effect::new(move || {
        let map = map.get();
        if let Some(id) = selected.get_untracked()
            && !map.tiles.iter().any(|t| t.id == id)
        {
            selected.set(None);
        }
        if let Some(current) = species.get_untracked()
            && !map.is_empty()
            && !map.species_ids().contains(&current)
        {
            species.set(None);
        }
    });

    // Keyboard shortcuts
    Effect::new(move || {
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let target_tag = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    .map(|el| el.tag_name())
                    .unwrap_or_default();
                if target_tag == "INPUT" || target_tag == "SELECT" || target_tag == "TEXTAREA" {
                    return;
                }

                match e.key().as_str() {
                    "Escape" => selected.set(None),
                    "+" | "=" => camera_commands.update(|c| c.push(CameraCommand::ZoomBy(ZOOM_STEP))),
                    "-" | "_" => camera_commands.update(|c| c.push(CameraCommand::ZoomBy(-ZOOM_STEP))),
                    "0" => camera_commands.update(|c| c.push(CameraCommand::ResetZoom)),
                    "v" => view_mode.update(|m| {
                        *m = match m {
                            ViewMode::TerrainType => ViewMode::Suitability,
                            ViewMode::Suitability => ViewMode::TerrainType,
                        }
                    }),
                    _ => {}
                }
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    let is_empty = Memo::new(move |_| map.with(|m| m.tiles.is_empty()));

    view! {
        <div style="width: 100%; height: 100%; position: relative; overflow: hidden; background: #0c0e17;">
            <MapCanvas />
            {move || {
                if is_empty.get() {
                    view! { <EmptyState /> }.into_any()
                } else {
                    ().into_any()
                }
            }}
            <Toolbar />
            <TileInfoPanel />
        </div>
    }
}

/// Placeholder shown while no tiles are available.
#[component]
fn EmptyState() -> impl IntoView {
    let load_state: RwSignal<LoadState> = expect_context();

    view! {
        <div style="position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; pointer-events: none; color: #5a5860; font-family: 'Inter', system-ui, sans-serif; font-size: 0.85rem;">
            {move || match load_state.get() {
                LoadState::Loading => "Loading map\u{2026}".to_string(),
                LoadState::Ready => "This map has no tiles".to_string(),
                LoadState::Failed(e) => format!("Map unavailable: {e}"),
            }}
        </div>
    }
}

const BUTTON_STYLE: &str = "background: #13161f; border: 1px solid #282c3e; border-radius: 6px; color: #e2e0d8; padding: 4px 10px; cursor: pointer; font-family: 'Inter', system-ui, sans-serif; font-size: 0.75rem;";

/// View-mode toggle, species picker, zoom handle and refresh.
#[component]
fn Toolbar() -> impl IntoView {
    let config: MapConfig = expect_context();
    let MapData(map) = expect_context();
    let CurrentViewMode(view_mode) = expect_context();
    let HighlightSpecies(species) = expect_context();
    let CameraCommands(camera_commands) = expect_context();
    let load_state: RwSignal<LoadState> = expect_context();

    let species_ids = Memo::new(move |_| map.with(|m| m.species_ids()));
    let push = move |command: CameraCommand| camera_commands.update(|c| c.push(command));
    let data_url = config.data_url.clone();

    view! {
        <div style="position: absolute; top: 12px; left: 12px; z-index: 10; display: flex; gap: 6px; align-items: center; background: rgba(12,14,23,0.85); border: 1px solid #282c3e; border-radius: 8px; padding: 6px;">
            {[ViewMode::TerrainType, ViewMode::Suitability]
                .into_iter()
                .map(|mode| {
                    view! {
                        <button
                            style=BUTTON_STYLE
                            style:border-color=move || if view_mode.get() == mode { "#f5c542" } else { "#282c3e" }
                            on:click=move |_| view_mode.set(mode)
                        >
                            {mode.label()}
                        </button>
                    }
                })
                .collect_view()}
            {move || {
                if view_mode.get() != ViewMode::Suitability {
                    return ().into_any();
                }
                let current = species.get().unwrap_or_default();
                view! {
                    <select
                        style=BUTTON_STYLE
                        on:change=move |e| {
                            let value = e
                                .target()
                                .and_then(|t| t.dyn_into::<web_sys::HtmlSelectElement>().ok())
                                .map(|el| el.value())
                                .unwrap_or_default();
                            species.set((!value.is_empty()).then_some(value));
                        }
                    >
                        <option value="" selected=current.is_empty()>"No species"</option>
                        {species_ids
                            .get()
                            .into_iter()
                            .map(|id| {
                                let is_current = id == current;
                                view! { <option value=id.clone() selected=is_current>{id.clone()}</option> }
                            })
                            .collect_view()}
                    </select>
                }
                .into_any()
            }}
            <button style=BUTTON_STYLE title="Zoom in" on:click=move |_| push(CameraCommand::ZoomBy(ZOOM_STEP))>"+"</button>
            <button style=BUTTON_STYLE title="Zoom out" on:click=move |_| push(CameraCommand::ZoomBy(-ZOOM_STEP))>"\u{2212}"</button>
            <button style=BUTTON_STYLE title="Reset zoom" on:click=move |_| push(CameraCommand::ResetZoom)>"1:1"</button>
            <button
                style=BUTTON_STYLE
                title="Reload map"
                disabled=move || load_state.get() == LoadState::Loading
                on:click=move |_| request_map(data_url.clone(), map, load_state)
            >
                "Refresh"
            </button>
        </div>
    }
}

fn info_row(label: impl Into<String>, value: String) -> impl IntoView {
    let label = label.into();
    view! {
        <div style="display: flex; justify-content: space-between; gap: 12px; font-size: 0.7rem; margin-top: 3px;">
            <span style="color: #9a9590;">{label}</span>
            <span style="color: #e2e0d8; font-family: 'JetBrains Mono', monospace;">{value}</span>
        </div>
    }
}

/// Details of the selected tile, anchored at the click point.
#[component]
fn TileInfoPanel() -> impl IntoView {
    let MapData(map) = expect_context();
    let Selected(selected) = expect_context();
    let SelectionPoint(selection_point) = expect_context();
    let CurrentViewMode(view_mode) = expect_context();
    let HighlightSpecies(species) = expect_context();

    let tile = Memo::new(move |_| {
        let id = selected.get()?;
        map.with(|m| m.tiles.iter().find(|t| t.id == id).cloned())
    });

    move || {
        let Some(tile) = tile.get() else {
            return ().into_any();
        };
        let (x, y) = selection_point.get();
        let fill = tile_fill(&tile, view_mode.get(), species.get().as_deref());
        let mut scores: Vec<(String, f64)> = tile.suitability.clone().into_iter().collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        view! {
            <div
                style:left=format!("{}px", x + 14.0)
                style:top=format!("{}px", y + 14.0)
                style="position: absolute; z-index: 20; min-width: 180px; max-width: 240px; background: #161921; border: 1px solid #282c3e; border-radius: 6px; box-shadow: 0 4px 16px rgba(0,0,0,0.5); padding: 8px 10px; font-family: 'Inter', system-ui, sans-serif;"
            >
                <div style="display: flex; align-items: center; justify-content: space-between; gap: 8px;">
                    <div style="display: flex; align-items: center; gap: 6px;">
                        <span style={format!("width: 10px; height: 10px; border-radius: 2px; background: {};", rgb_css((fill.r, fill.g, fill.b)))} />
                        <span style="font-size: 0.8rem; font-weight: 700; color: #e2e0d8;">{tile.terrain_type.clone()}</span>
                    </div>
                    <button
                        style="background: none; border: none; color: #5a5860; cursor: pointer; font-size: 0.9rem;"
                        on:click=move |_| selected.set(None)
                    >
                        "\u{00D7}"
                    </button>
                </div>
                {info_row("Tile", format!("#{} ({}, {})", tile.id, tile.x, tile.y))}
                {info_row("Climate", tile.climate_zone.clone())}
                {info_row("Elevation", format!("{:.2}", tile.elevation))}
                {info_row("Color", tile.color.clone())}
                {(!scores.is_empty()).then(|| view! {
                    <div style="margin-top: 6px; padding-top: 4px; border-top: 1px solid rgba(40,44,62,0.5);">
                        {scores
                            .into_iter()
                            .map(|(id, score)| info_row(id, format!("{:.0}%", score * 100.0)))
                            .collect_view()}
                    </div>
                })}
            </div>
        }
        .into_any()
    }
}

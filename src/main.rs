//! Star Blaze entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, KeyboardEvent};

    use star_blaze::audio::WebAudioSink;
    use star_blaze::input::{Button, InputEvent, KeyCode};
    use star_blaze::renderer::{RenderState, shapes};
    use star_blaze::sim::{GameEvent, GamePhase, Viewport};
    use star_blaze::{Game, Settings, Tuning};

    /// Controls wired to the router (the big overlay play button acts as play)
    const CONTROL_IDS: [&str; 7] = [
        "left-btn",
        "right-btn",
        "shoot-btn",
        "pause-btn",
        "play-btn",
        "resume-big-btn",
        "restart-btn",
    ];

    /// Delay before re-measuring after a rotation
    const ORIENTATION_SETTLE_MS: i32 = 120;

    /// Browser-side wrapper around the game
    struct App {
        game: Game<WebAudioSink>,
        render_state: Option<RenderState>,
        document: Document,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl App {
        fn new(seed: u64, viewport: Viewport, settings: Settings, document: Document) -> Self {
            Self {
                game: Game::new(seed, viewport, Tuning::default(), settings, WebAudioSink::new()),
                render_state: None,
                document,
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        /// Route an input event; every input is a user gesture that may
        /// unlock audio
        fn input(&mut self, event: InputEvent) {
            self.game.audio().sink().resume();
            self.game.handle_input(event);
        }

        fn frame(&mut self, time: f64) {
            self.game.frame(time);

            // Track frame times for FPS
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;
            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }

            self.render();
            self.update_hud();
        }

        fn render(&mut self) {
            let vertices = shapes::scene(&self.game.snapshot());
            if let Some(ref mut render_state) = self.render_state {
                match render_state.render(&vertices) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        let (w, h) = render_state.size;
                        let viewport = render_state.viewport;
                        render_state.resize(w, h, viewport);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        /// Apply HUD notifications and per-frame labels
        fn update_hud(&mut self) {
            for event in self.game.drain_ui_events() {
                match event {
                    GameEvent::ScoreChanged(score) => {
                        self.set_text("score", &score.to_string());
                    }
                    GameEvent::GameOver { score } => {
                        self.set_text("final-score", &score.to_string());
                        self.set_hidden("result-panel", false);
                    }
                    GameEvent::PhaseChanged { to, .. } => {
                        if let GamePhase::Countdown(_) = to {
                            self.set_hidden("result-panel", true);
                        }
                        self.set_hidden("pause-overlay", to != GamePhase::Paused);
                        self.set_dimmed(
                            "play-btn",
                            !matches!(to, GamePhase::Idle | GamePhase::Paused),
                        );
                        self.set_dimmed("pause-btn", to != GamePhase::Running);
                    }
                    _ => {}
                }
            }

            let label = self.game.phase().countdown_label();
            self.set_hidden("countdown", label.is_none());
            if let Some(label) = label {
                self.set_text("countdown", &label);
            }

            let show_fps = self.game.settings().show_fps;
            self.set_hidden("hud-fps", !show_fps);
            if show_fps {
                self.set_text("hud-fps", &format!("{} fps", self.fps));
            }
        }

        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                if el.text_content().as_deref() != Some(text) {
                    el.set_text_content(Some(text));
                }
            }
        }

        fn set_hidden(&self, id: &str, hidden: bool) {
            if let Some(el) = self.document.get_element_by_id(id) {
                let _ = el.class_list().toggle_with_force("hidden", hidden);
            }
        }

        fn set_dimmed(&self, id: &str, dimmed: bool) {
            if let Some(el) = self.document.get_element_by_id(id) {
                let _ = el.class_list().toggle_with_force("dimmed", dimmed);
            }
        }

        fn toggle_mute(&mut self) {
            let mut settings = self.game.settings().clone();
            settings.muted = !settings.muted;
            settings.save();
            self.set_dimmed("mute-btn", settings.muted);
            log::info!("Muted: {}", settings.muted);
            self.game.set_settings(settings);
        }

        /// Match the canvas to its CSS box and the playfield to CSS pixels
        fn resize(&mut self, canvas: &HtmlCanvasElement, dpr: f64) {
            let (width, height, viewport) = canvas_size(canvas, dpr);
            canvas.set_width(width);
            canvas.set_height(height);
            self.game.resize(viewport.width, viewport.height);
            if let Some(ref mut render_state) = self.render_state {
                render_state.resize(width, height, self.game.state().viewport);
            }
        }
    }

    /// Physical canvas size plus the logical viewport
    fn canvas_size(canvas: &HtmlCanvasElement, dpr: f64) -> (u32, u32, Viewport) {
        let client_w = canvas.client_width().max(1);
        let client_h = canvas.client_height().max(1);
        let width = (client_w as f64 * dpr) as u32;
        let height = (client_h as f64 * dpr) as u32;
        (
            width,
            height,
            Viewport::new(client_w as f32, client_h as f32),
        )
    }

    fn js_error(e: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&e.to_string())
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Star Blaze starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.class_list().add_1("hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        let dpr = window.device_pixel_ratio();
        let (width, height, viewport) = canvas_size(&canvas, dpr);
        canvas.set_width(width);
        canvas.set_height(height);

        let seed = js_sys::Date::now() as u64;
        let settings = Settings::load();
        let app = Rc::new(RefCell::new(App::new(
            seed,
            viewport,
            settings,
            document.clone(),
        )));
        log::info!("Game initialized with seed: {}", seed);

        // Initialize WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(js_error)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(js_error)?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        // Without a renderer the HUD and audio still run
        match RenderState::new(surface, &adapter, width, height, viewport).await {
            Ok(render_state) => app.borrow_mut().render_state = Some(render_state),
            Err(e) => log::error!("Rendering disabled: {}", e),
        }

        setup_keyboard(&window, app.clone())?;
        setup_controls(&document, app.clone())?;
        setup_auto_pause(&window, &document, app.clone())?;
        setup_resize(&window, canvas, app.clone())?;

        {
            let mut a = app.borrow_mut();
            a.set_dimmed("pause-btn", true);
            let muted = a.game.settings().muted;
            a.set_dimmed("mute-btn", muted);
        }

        request_animation_frame(app);

        log::info!("Star Blaze running!");
        Ok(())
    }

    fn setup_keyboard(window: &web_sys::Window, app: Rc<RefCell<App>>) -> Result<(), JsValue> {
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Some(key) = KeyCode::from_code(&event.code()) {
                    // Keep space/arrows from scrolling the page
                    event.prevent_default();
                    app.borrow_mut().input(InputEvent::KeyDown {
                        key,
                        repeat: event.repeat(),
                    });
                }
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            if let Some(key) = KeyCode::from_code(&event.code()) {
                app.borrow_mut().input(InputEvent::KeyUp { key });
            }
        });
        window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    /// On-screen buttons: touch and mouse both count
    fn setup_controls(document: &Document, app: Rc<RefCell<App>>) -> Result<(), JsValue> {
        for id in CONTROL_IDS {
            let (Some(el), Some(button)) = (document.get_element_by_id(id), Button::from_id(id))
            else {
                continue;
            };

            for event_name in ["touchstart", "mousedown"] {
                let app = app.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                    // A touch would otherwise also synthesize a mousedown
                    event.prevent_default();
                    app.borrow_mut().input(InputEvent::ButtonDown(button));
                });
                el.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())?;
                closure.forget();
            }

            if button.is_hold() {
                for event_name in ["touchend", "touchcancel", "mouseup", "mouseleave"] {
                    let app = app.clone();
                    let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                        app.borrow_mut().input(InputEvent::ButtonUp(button));
                    });
                    el.add_event_listener_with_callback(
                        event_name,
                        closure.as_ref().unchecked_ref(),
                    )?;
                    closure.forget();
                }
            }
        }

        if let Some(el) = document.get_element_by_id("mute-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                app.borrow_mut().toggle_mute();
            });
            el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn setup_auto_pause(
        window: &web_sys::Window,
        document: &Document,
        app: Rc<RefCell<App>>,
    ) -> Result<(), JsValue> {
        // Visibility change (tab switch, minimize)
        {
            let app = app.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let mut a = app.borrow_mut();
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    a.input(InputEvent::FocusLost);
                    log::info!("Tab hidden");
                } else {
                    a.game.reset_clock();
                }
            });
            document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            )?;
            closure.forget();
        }

        // Window blur (click outside)
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            app.borrow_mut().input(InputEvent::FocusLost);
        });
        window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    fn setup_resize(
        window: &web_sys::Window,
        canvas: HtmlCanvasElement,
        app: Rc<RefCell<App>>,
    ) -> Result<(), JsValue> {
        {
            let canvas = canvas.clone();
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                relayout(&canvas, &app);
            });
            window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Some mobile browsers report the old size until the rotation settles
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let Some(window) = web_sys::window() else {
                return;
            };
            let canvas = canvas.clone();
            let app = app.clone();
            let delayed = Closure::once(move || relayout(&canvas, &app));
            if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                delayed.as_ref().unchecked_ref(),
                ORIENTATION_SETTLE_MS,
            ) {
                log::warn!("Could not schedule relayout: {:?}", e);
            }
            delayed.forget();
        });
        window.add_event_listener_with_callback(
            "orientationchange",
            closure.as_ref().unchecked_ref(),
        )?;
        closure.forget();
        Ok(())
    }

    fn relayout(canvas: &HtmlCanvasElement, app: &Rc<RefCell<App>>) {
        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0);
        app.borrow_mut().resize(canvas, dpr);
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(app: Rc<RefCell<App>>, time: f64) {
        app.borrow_mut().frame(time);
        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    if let Err(e) = wasm_game::run().await {
        log::error!("Star Blaze failed to start: {:?}", e);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Star Blaze (native) starting...");
    log::info!("Native mode runs a headless autopilot - build for wasm32 to play");

    let tuning = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => star_blaze::Tuning::from_json_or_default(&json),
            Err(e) => {
                log::warn!("Cannot read tuning file {}: {}", path, e);
                star_blaze::Tuning::default()
            }
        },
        None => star_blaze::Tuning::default(),
    };

    let score = autopilot(tuning);
    println!("\nAutopilot finished with score {}", score);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Play one run headlessly: chase the adversary and fire on a fixed cadence
#[cfg(not(target_arch = "wasm32"))]
fn autopilot(tuning: star_blaze::Tuning) -> u32 {
    use star_blaze::audio::NullSink;
    use star_blaze::input::{Button, InputEvent};
    use star_blaze::sim::{Command, GamePhase, Viewport};
    use star_blaze::{Game, Settings};

    const FRAME_MS: u32 = 16;
    const FIRE_EVERY_MS: u32 = 240;
    const TIME_LIMIT_MS: u32 = 60_000;

    let mut game = Game::new(
        0x5eed,
        Viewport::default(),
        tuning,
        Settings::default(),
        NullSink,
    );
    game.command(Command::Start);

    let mut held = (false, false);
    let mut elapsed = 0;
    while elapsed < TIME_LIMIT_MS && game.phase() != GamePhase::GameOver {
        game.update(FRAME_MS);
        elapsed += FRAME_MS;

        if game.phase() != GamePhase::Running {
            continue;
        }

        let snapshot = game.snapshot();
        let target = snapshot.adversary.pos.x + snapshot.adversary.width / 2.0;
        let center = snapshot.player.x + snapshot.player.width / 2.0;
        let want = (target < center - 8.0, target > center + 8.0);

        if want.0 != held.0 {
            let event = if want.0 { InputEvent::ButtonDown } else { InputEvent::ButtonUp };
            game.handle_input(event(Button::Left));
        }
        if want.1 != held.1 {
            let event = if want.1 { InputEvent::ButtonDown } else { InputEvent::ButtonUp };
            game.handle_input(event(Button::Right));
        }
        held = want;

        if elapsed % FIRE_EVERY_MS < FRAME_MS {
            game.handle_input(InputEvent::ButtonDown(Button::Shoot));
        }
    }

    let snapshot = game.snapshot();
    match snapshot.to_json() {
        Ok(json) => log::info!("Final snapshot: {}", json),
        Err(e) => log::warn!("Snapshot not serializable: {}", e),
    }
    snapshot.score
}

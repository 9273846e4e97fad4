use std::{cell::RefCell, rc::Rc};

use chrono::{Local, Utc};
use futures_util::StreamExt;
use gloo_timers::future::{IntervalStream, TimeoutFuture};
use js_sys::{Array, Promise};
use serde_json::json;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    window, AddEventListenerOptions, Document, Element, Event, EventTarget,
    HtmlElement, HtmlImageElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit,
};

use crate::{
    config::{
        self, LoaderConfig, COUNTDOWN_TICK_MS, DEFAULT_LOG_LEVEL, FADE_ROOT_MARGIN,
        FADE_THRESHOLD, HERO_HEIGHT_VAR, PULSE_MS,
    },
    countdown::{Countdown, TargetDate, Tick, Unit},
    fade::{FadeBook, Placement},
    hero::{hero_height, HeroHeight, RemeasureGuard, ResizeCoalescer},
    preload::{reveal_plan, Frame, LoadProgress, RevealStep},
    share::{ShareLinks, ShareTarget},
    telemetry::{LogLevel, Telemetry},
};

const FADE_INDEX_ATTR: &str = "data-fade-index";

thread_local! {
    static HERO_REMEASURE: RefCell<RemeasureGuard> = RefCell::new(RemeasureGuard::default());
}

fn current_document() -> Option<Document> {
    window()?.document()
}

fn viewport_size() -> (f64, f64) {
    let Some(win) = window() else {
        return (1280.0, 720.0);
    };

    let width = win
        .inner_width()
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(1280.0);
    let height = win
        .inner_height()
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(720.0);

    (width, height)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn query(document: &Document, selector: &str) -> Option<Element> {
    document.query_selector(selector).ok().flatten()
}

fn query_all(document: &Document, selector: &str) -> Vec<Element> {
    let Ok(nodes) = document.query_selector_all(selector) else {
        return Vec::new();
    };

    (0..nodes.length())
        .filter_map(|index| nodes.item(index))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

fn add_class(element: &Element, class: &str) {
    let _ = element.class_list().add_1(class);
}

fn remove_class(element: &Element, class: &str) {
    let _ = element.class_list().remove_1(class);
}

fn set_style(element: &Element, property: &str, value: &str) {
    if let Some(element) = element.dyn_ref::<HtmlElement>() {
        let _ = element.style().set_property(property, value);
    }
}

/// Resolves on the next `requestAnimationFrame` callback.
async fn next_animation_frame() {
    let promise = Promise::new(&mut |resolve, _reject| {
        if let Some(win) = window() {
            let _ = win.request_animation_frame(&resolve);
        }
    });
    let _ = JsFuture::from(promise).await;
}

fn listen<F>(target: &EventTarget, event: &str, passive: bool, handler: F)
where
    F: FnMut() + 'static,
{
    let callback = Closure::<dyn FnMut()>::new(handler);
    let options = AddEventListenerOptions::new();
    options.set_passive(passive);

    let _ = target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        callback.as_ref().unchecked_ref(),
        &options,
    );
    callback.forget();
}

fn listen_once<F>(target: &EventTarget, event: &str, handler: F)
where
    F: FnOnce() + 'static,
{
    let callback = Closure::once_into_js(handler);
    let options = AddEventListenerOptions::new();
    options.set_once(true);

    let _ = target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        callback.unchecked_ref(),
        &options,
    );
}

fn on_dom_ready<F>(document: &Document, handler: F)
where
    F: FnOnce() + 'static,
{
    if document.ready_state() == "loading" {
        listen_once(document, "DOMContentLoaded", handler);
    } else {
        handler();
    }
}

#[derive(Clone)]
struct LoaderNodes {
    loader: Option<Element>,
    progress: Option<Element>,
    percent: Option<Element>,
    background: Option<Element>,
    foreground: Option<Element>,
    body: Option<HtmlElement>,
}

impl LoaderNodes {
    fn query(document: &Document) -> Self {
        Self {
            loader: document.get_element_by_id("loader"),
            progress: query(document, ".loader-progress"),
            percent: query(document, ".loader-percent"),
            background: query(document, ".bg-image"),
            foreground: query(document, ".front-image"),
            body: document.body(),
        }
    }

    fn paint(&self, frame: &Frame) {
        if let Some(progress) = &self.progress {
            set_style(progress, "width", &frame.width_style());
        }

        if let Some(percent) = &self.percent {
            percent.set_text_content(Some(&frame.label_text()));
            set_style(percent, "left", &frame.label_left_style());
            set_style(percent, "transform", "translate(-50%, -50%)");
        }
    }
}

fn start_loader(document: &Document, telemetry: Telemetry) {
    let nodes = LoaderNodes::query(document);
    let raw_config = nodes
        .loader
        .as_ref()
        .and_then(|loader| loader.get_attribute("data-loader-config"));

    let config = LoaderConfig::from_attribute(raw_config.as_deref()).unwrap_or_else(|err| {
        telemetry.event(
            LogLevel::Warn,
            "config.rejected",
            json!({ "source": "data-loader-config", "error": err.to_string() }),
        );
        LoaderConfig::default()
    });

    let progress = Rc::new(RefCell::new(LoadProgress::new(config.assets.len())));

    for (index, src) in config.assets.into_iter().enumerate() {
        preload_asset(index, src, progress.clone(), telemetry);
    }

    {
        let progress = progress.clone();
        let fallback_ms = config.fallback_ms;
        spawn_local(async move {
            TimeoutFuture::new(fallback_ms).await;
            let mut progress = progress.borrow_mut();
            let stalled = progress.total() - progress.loaded();
            if progress.force_complete() {
                telemetry.event(
                    LogLevel::Warn,
                    "loader.fallback_fired",
                    json!({ "after_ms": fallback_ms, "stalled_assets": stalled }),
                );
            }
        });
    }

    spawn_local(run_progress_loop(progress, nodes, telemetry));
}

fn preload_asset(
    index: usize,
    src: String,
    progress: Rc<RefCell<LoadProgress>>,
    telemetry: Telemetry,
) {
    let Ok(image) = HtmlImageElement::new() else {
        progress.borrow_mut().settle(index);
        return;
    };

    spawn_local(async move {
        let outcome = wait_for_image(&image, &src).await;

        let mut progress = progress.borrow_mut();
        if progress.settle(index) {
            telemetry.event(
                LogLevel::Debug,
                "loader.asset_settled",
                json!({
                    "src": src,
                    "outcome": outcome,
                    "loaded": progress.loaded(),
                    "total": progress.total(),
                }),
            );
        }
    });
}

/// Starts the fetch and resolves with the settling event type, `load` or `error`.
async fn wait_for_image(image: &HtmlImageElement, src: &str) -> String {
    let promise = Promise::new(&mut |resolve, _reject| {
        image.set_onload(Some(&resolve));
        image.set_onerror(Some(&resolve));
    });
    image.set_src(src);

    JsFuture::from(promise)
        .await
        .ok()
        .and_then(|value| value.dyn_into::<Event>().ok())
        .map(|event| event.type_())
        .unwrap_or_else(|| "error".to_string())
}

async fn run_progress_loop(
    progress: Rc<RefCell<LoadProgress>>,
    nodes: LoaderNodes,
    telemetry: Telemetry,
) {
    loop {
        next_animation_frame().await;

        let frame = progress.borrow_mut().advance_frame();
        nodes.paint(&frame);
        if frame.complete {
            break;
        }
    }

    if progress.borrow_mut().claim_finish() {
        finish(nodes, telemetry);
    }
}

/// Runs the reveal plan: steps before `NextTick` synchronously, the rest on
/// a later task.
fn finish(nodes: LoaderNodes, telemetry: Telemetry) {
    telemetry.event(LogLevel::Info, "loader.finished", json!({}));

    let plan = reveal_plan();
    let split = plan
        .iter()
        .position(|step| *step == RevealStep::NextTick)
        .unwrap_or(plan.len());
    let (now, later) = plan.split_at(split);

    for step in now {
        run_reveal_step(*step, &nodes, telemetry);
    }

    let later = later.to_vec();
    spawn_local(async move {
        TimeoutFuture::new(0).await;
        for step in later {
            run_reveal_step(step, &nodes, telemetry);
        }
    });
}

fn run_reveal_step(step: RevealStep, nodes: &LoaderNodes, telemetry: Telemetry) {
    match step {
        RevealStep::HeroHeight => refresh_hero(telemetry),
        RevealStep::NextTick => {}
        RevealStep::HideLoader => {
            if let Some(loader) = &nodes.loader {
                add_class(loader, "hidden");
            }
        }
        RevealStep::RemoveLoader { after_ms } => {
            if let Some(loader) = nodes.loader.clone() {
                spawn_local(async move {
                    TimeoutFuture::new(after_ms).await;
                    loader.remove();
                });
            }
        }
        RevealStep::PageReady => {
            if let Some(body) = &nodes.body {
                add_class(body, "page-ready");
            }
        }
        RevealStep::BackgroundLoaded => {
            if let Some(background) = &nodes.background {
                add_class(background, "loaded");
            }
        }
        RevealStep::ForegroundVisible { after_ms } => {
            if let Some(foreground) = nodes.foreground.clone() {
                spawn_local(async move {
                    TimeoutFuture::new(after_ms).await;
                    add_class(&foreground, "visible");
                });
            }
        }
        RevealStep::InitScrollFade => init_scroll_fade(telemetry),
    }
}

fn update_hero_height(document: &Document, telemetry: Telemetry) {
    let (viewport_width, viewport_height) = viewport_size();
    let image = query(document, ".bg-image img")
        .and_then(|element| element.dyn_into::<HtmlImageElement>().ok());
    let natural = image
        .as_ref()
        .map(|image| (image.natural_width(), image.natural_height()));

    let height = hero_height(natural, viewport_width, viewport_height);
    apply_hero_height(document, height);

    let armed = HERO_REMEASURE.with(|guard| guard.borrow_mut().arm(height, image.is_some()));
    if let (true, Some(image)) = (armed, image) {
        listen_once(&image, "load", move || {
            HERO_REMEASURE.with(|guard| guard.borrow_mut().disarm());
            refresh_hero(telemetry);
        });
    }

    telemetry.event(
        LogLevel::Debug,
        "hero.height_applied",
        json!({ "px": height.px(), "kind": height.kind() }),
    );
}

fn apply_hero_height(document: &Document, height: HeroHeight) {
    let value = height.css_value();

    if let Some(root) = document.document_element() {
        set_style(&root, HERO_HEIGHT_VAR, &value);
    }

    if let Some(spacer) = query(document, ".hero-spacer") {
        set_style(&spacer, "height", &value);
    }

    if height.sizes_background() {
        if let Some(background) = query(document, ".bg-image") {
            set_style(&background, "height", &value);
        }
    }
}

fn refresh_hero(telemetry: Telemetry) {
    if let Some(document) = current_document() {
        update_hero_height(&document, telemetry);
    }
}

fn install_hero_listeners(document: &Document, telemetry: Telemetry) {
    if let Some(win) = window() {
        let coalescer = Rc::new(RefCell::new(ResizeCoalescer::default()));
        listen(&win, "resize", true, move || {
            if !coalescer.borrow_mut().request() {
                return;
            }

            let coalescer = coalescer.clone();
            spawn_local(async move {
                next_animation_frame().await;
                coalescer.borrow_mut().flush();
                refresh_hero(telemetry);
            });
        });

        listen(&win, "orientationchange", false, move || refresh_hero(telemetry));
    }

    for image in query_all(document, ".bg-image img, .front-image img") {
        listen_once(&image, "load", move || refresh_hero(telemetry));
    }

    on_dom_ready(document, move || refresh_hero(telemetry));
}

fn init_scroll_fade(telemetry: Telemetry) {
    let Some(document) = current_document() else {
        return;
    };

    let items = query_all(&document, ".fade-on-scroll");
    if items.is_empty() {
        return;
    }

    let (_, viewport_height) = viewport_size();
    let book = Rc::new(RefCell::new(FadeBook::default()));
    let observer = fade_observer(book.clone());

    for item in &items {
        let top = item.get_bounding_client_rect().top();
        let (index, placement) = book.borrow_mut().place(top, viewport_height);

        match (placement, &observer) {
            (Placement::RevealNow, _) => add_class(item, "in-view"),
            (Placement::Observe, Some(observer)) => {
                let _ = item.set_attribute(FADE_INDEX_ATTR, &index.to_string());
                observer.observe(item);
            }
            (Placement::Observe, None) => {
                book.borrow_mut().on_intersection(index, true);
                add_class(item, "in-view");
            }
        }
    }

    let book = book.borrow();
    telemetry.event(
        LogLevel::Debug,
        "fade.initialized",
        json!({ "items": book.tracked(), "observed": book.pending() }),
    );
}

fn fade_observer(book: Rc<RefCell<FadeBook>>) -> Option<IntersectionObserver> {
    let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
        move |entries: Array, observer: IntersectionObserver| {
            for entry in entries.iter() {
                let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                    continue;
                };

                let target = entry.target();
                let Some(index) = target
                    .get_attribute(FADE_INDEX_ATTR)
                    .and_then(|value| value.parse::<usize>().ok())
                else {
                    continue;
                };

                if book.borrow_mut().on_intersection(index, entry.is_intersecting()) {
                    add_class(&target, "in-view");
                    observer.unobserve(&target);
                }
            }
        },
    );

    let options = IntersectionObserverInit::new();
    options.set_root_margin(FADE_ROOT_MARGIN);
    options.set_threshold(&JsValue::from_f64(FADE_THRESHOLD));

    let observer =
        IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options).ok()?;
    callback.forget();
    Some(observer)
}

struct CountdownView {
    container: Element,
    units: Vec<(Unit, Element)>,
    done_label: String,
}

impl CountdownView {
    fn query(container: Element) -> Self {
        let units = Unit::ALL
            .into_iter()
            .filter_map(|unit| {
                let selector = format!("[data-unit=\"{}\"]", unit.as_str());
                let element = container.query_selector(&selector).ok().flatten()?;
                Some((unit, element))
            })
            .collect();
        let done_label = config::done_label(container.get_attribute("data-done-label").as_deref());

        Self {
            container,
            units,
            done_label,
        }
    }

    /// Applies one tick. Returns `true` once the countdown has nothing left to do.
    fn render(&self, tick: Tick, telemetry: Telemetry) -> bool {
        match tick {
            Tick::Update(changed) => {
                for (unit, text) in changed {
                    let Some((_, element)) =
                        self.units.iter().find(|(candidate, _)| *candidate == unit)
                    else {
                        continue;
                    };
                    element.set_text_content(Some(&text));
                    pulse(element.clone());
                }
                false
            }
            Tick::Finished => {
                self.show_done();
                telemetry.event(LogLevel::Info, "countdown.finished", json!({}));
                true
            }
            Tick::Idle => true,
        }
    }

    fn show_done(&self) {
        let Some(document) = self.container.owner_document() else {
            return;
        };

        self.container.set_inner_html("");
        if let Ok(done) = document.create_element("div") {
            done.set_class_name("cd-done");
            done.set_text_content(Some(&self.done_label));
            let _ = self.container.append_child(&done);
        }
    }
}

fn pulse(element: Element) {
    add_class(&element, "update");
    spawn_local(async move {
        next_animation_frame().await;
        TimeoutFuture::new(PULSE_MS).await;
        remove_class(&element, "update");
    });
}

fn start_countdown(document: &Document, telemetry: Telemetry) {
    let Some(container) = query(document, ".top-countdown[data-target]") else {
        return;
    };

    let raw_target = container.get_attribute("data-target").unwrap_or_default();
    let target = match TargetDate::parse(&raw_target).and_then(|date| date.instant_in(&Local)) {
        Ok(target) => target,
        Err(err) => {
            telemetry.event(
                LogLevel::Warn,
                "countdown.config_rejected",
                json!({ "target": raw_target, "error": err.to_string() }),
            );
            return;
        }
    };

    telemetry.event(
        LogLevel::Info,
        "countdown.started",
        json!({ "target": target.to_rfc3339() }),
    );

    let view = CountdownView::query(container);
    let mut countdown = Countdown::new(target.timestamp_millis());

    spawn_local(async move {
        if view.render(countdown.tick(now_ms()), telemetry) {
            return;
        }

        let mut ticks = IntervalStream::new(COUNTDOWN_TICK_MS);
        while ticks.next().await.is_some() {
            if view.render(countdown.tick(now_ms()), telemetry) {
                break;
            }
        }
    });
}

fn install_share_links(document: &Document, telemetry: Telemetry) {
    on_dom_ready(document, move || {
        let Some(document) = current_document() else {
            return;
        };

        let page_url = document
            .location()
            .and_then(|location| location.href().ok())
            .unwrap_or_default();
        let links = ShareLinks::build(&page_url, &document.title());

        let mut applied = 0;
        for anchor in query_all(&document, "a[data-share]") {
            let Some(target) = anchor
                .get_attribute("data-share")
                .as_deref()
                .and_then(ShareTarget::from_attr)
            else {
                continue;
            };

            if anchor.set_attribute("href", links.href_for(target)).is_ok() {
                applied += 1;
            }
        }

        telemetry.event(
            LogLevel::Debug,
            "share.links_applied",
            json!({ "anchors": applied }),
        );
    });
}

pub fn run() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);

    let Some(document) = current_document() else {
        return;
    };

    let min_level = config::parse_log_level(
        document
            .document_element()
            .and_then(|root| root.get_attribute("data-log-level"))
            .as_deref(),
        DEFAULT_LOG_LEVEL,
    );
    let telemetry = Telemetry::new(min_level);

    start_loader(&document, telemetry);
    install_hero_listeners(&document, telemetry);
    start_countdown(&document, telemetry);
    install_share_links(&document, telemetry);
}

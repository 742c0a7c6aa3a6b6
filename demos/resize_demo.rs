use variety_engine::{
    document::ElementSpec,
    render::{renderer, variety_class},
    rules::WidthRule,
    EngineConfig, EngineError, EngineEvent, MemoryDocument, VarietyEngine, Viewport,
};

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{sleep, timeout};

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    env_logger::init();

    // Build a small document. Every image is shipped as a <noscript> placeholder that carries
    // the original URL and alt text; the engine renders the actual <img> elements.
    let mut doc = MemoryDocument::with_viewport(Viewport::new(1280, 800));
    let gallery = doc
        .append_element(doc.body(), ElementSpec::new("section").attr("id", "gallery"))
        .expect("cannot create gallery");
    for (url, alt) in [
        ("https://example.com/__data/assets/image/2021/0412/harbour.jpg", "The harbour at dawn"),
        ("https://example.com/__data/assets/image/2021/0412/market.png", "Saturday market"),
        ("/static/logo.gif", "Logo"),
    ] {
        doc.append_element(
            gallery,
            ElementSpec::new("noscript").attr("data-url", url).attr("data-alt", alt),
        )
        .expect("cannot create placeholder");
    }

    // Configure the engine. Rules are matched in the order they are declared; the first rule
    // whose width range contains the viewport width wins. The "mobile" rule renders through a
    // renderer that is registered by name further down.
    let config = EngineConfig::builder()
        .rule("mobile", WidthRule::range(0.0, 480.0).with_named_renderer("lazy"))
        .rule("tablet", WidthRule::range(481.0, 1024.0))
        .rule("desktop", WidthRule::from_min(1025.0))
        .allowed_root("#gallery")
        .debounce(Duration::from_millis(150))
        .build()?;

    // A renderer that inserts the same <img> as the default one, with lazy loading turned on
    let lazy = renderer(|doc, req| {
        let img = ElementSpec::new("img")
            .attr("src", req.url)
            .attr("alt", req.alt)
            .attr("class", variety_class(req.variety))
            .attr("loading", "lazy");
        log::info!("lazy renderer: {} -> {}", req.candidate.url, req.url);
        doc.insert_before(req.candidate.node, img)
    });
    let renderers = HashMap::from([("lazy".to_string(), lazy)]);

    // Creating the engine runs the first pass and starts watching viewport resizes, since we
    // are inside a tokio runtime.
    let mut engine = VarietyEngine::with_renderers(config, doc, renderers)?;
    println!("initial:\n{}\n", engine.with_document(|d| d.to_html())?);

    // Note that you will only receive events sent from this point on.
    let mut event_rx = engine.subscribe_events();

    // Simulate a user dragging the window smaller. Only the last size counts: the engine waits
    // until the viewport has been quiet for the debounce interval.
    for width in [1100, 900, 700, 500, 360] {
        engine.with_document(|d| d.set_viewport(width, 800))?;
        sleep(Duration::from_millis(40)).await;
    }

    while let Ok(Ok(event)) = timeout(Duration::from_millis(500), event_rx.recv()).await {
        println!("event: {}", event);
        if matches!(event, EngineEvent::PassCompleted { .. }) {
            break;
        }
    }
    println!("after resize:\n{}\n", engine.with_document(|d| d.to_html())?);

    // Teardown stops the watcher and removes every rendered image
    let removed = engine.teardown()?;
    println!("teardown removed {} images", removed);

    Ok(())
}

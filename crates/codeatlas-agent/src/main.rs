mod command;
mod config;

use anyhow::Result;
use codeatlas_core::SurfaceEvent;
use codeatlas_scene::{config as scene_config, refresh, surface, MemorySource, Scene, SceneConfig};
use command::Command;
use config::parse_args;
use crossbeam_channel::Receiver;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_writer(std::io::stderr).try_init();
}

// Reads stdin on its own thread; the channel closes at end of input.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
    });
    rx
}

fn present(ev: SurfaceEvent) {
    // Ticks are frequent and carry nothing to show.
    if ev == SurfaceEvent::AdvancePositions {
        return;
    }
    match serde_json::to_string(&ev) {
        Ok(json) => println!("event {json}"),
        Err(e) => tracing::warn!(error = %e, "failed to encode surface event"),
    }
}

fn print_status(scene: &Scene) {
    let status = scene.read(|st| {
        serde_json::json!({
            "nodes": st.model.nodes.keys().collect::<Vec<_>>(),
            "edges": st.model.edges.keys().map(ToString::to_string).collect::<Vec<_>>(),
            "selected": st.selected_items(),
            "working_set": st.lru.iter().collect::<Vec<_>>(),
            "schemes": st.schemes.names(),
            "valid_schemes": st.schemes.valid().iter().map(|(n, _)| n).collect::<Vec<_>>(),
            "denylist": st.denylist(),
            "auto_focus": st.is_auto_focus(),
        })
    });
    println!("status {status}");
}

fn run(scene: &Scene, cfg: &SceneConfig, cmd: Command) {
    match cmd {
        Command::Add(key) => {
            if !scene.add_node(&key) && !scene.contains_node(&key) {
                println!("rejected {key}");
            }
        }
        Command::Edge(src, tar) => {
            if !scene.add_edge(&src, &tar) {
                println!("rejected {src} -> {tar}");
            }
        }
        Command::Link(src, tar) => {
            if !scene.add_custom_edge(&src, &tar) {
                println!("rejected {src} -> {tar}");
            }
        }
        Command::Select(item) => {
            if !scene.select(&item) {
                println!("no such item");
            }
        }
        Command::Nav(dir) => match scene.navigate(dir) {
            Some(item) => tracing::debug!(?item, "focus moved"),
            None => println!("nothing in that direction"),
        },
        Command::Refs(mut query) => {
            if query.max_count.is_none() {
                query.max_count = cfg.expand_max_count;
            }
            let added = scene.expand_references(&query);
            println!("added {}", added.len());
        }
        Command::Del => scene.delete_selected(false),
        Command::Deny => scene.delete_selected(true),
        Command::Allow(key) => {
            if !scene.remove_from_denylist(&key) {
                println!("{key} was not forbidden");
            }
        }
        Command::Comment(text) => {
            if !scene.update_selected_comment(&text) {
                println!("select exactly one item to comment");
            }
        }
        Command::Save(name) => {
            if !scene.save_scheme(&name) {
                println!("nothing selected");
            }
        }
        Command::Show { name, select } => {
            if !scene.show_scheme(&name, select) {
                println!("no scheme named {name}");
            }
        }
        Command::Drop(name) => {
            if !scene.delete_scheme(&name) {
                println!("no scheme named {name}");
            }
        }
        Command::Status => print_status(scene),
        Command::Quit => {}
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = parse_args()?;

    let mut cfg = match &args.config {
        Some(path) => scene_config::load_or_default_from_path(path),
        None => scene_config::load_or_default(),
    };
    if let Some(cap) = args.lru {
        cfg.lru_max_length = cap;
    }
    let source = match &args.db {
        Some(path) => MemorySource::load(path)?,
        None => MemorySource::default(),
    };
    tracing::info!(
        entities = source.entity_count(),
        lru = cfg.lru_max_length,
        refresh_ms = cfg.refresh_interval_ms,
        "scene configured"
    );

    let (scene, events) = Scene::new(cfg.clone(), Arc::new(source));
    let refresher = refresh::spawn(cfg.refresh_interval(), scene.surface_sender())?;
    let commands = spawn_stdin_reader();
    let idle = Duration::from_millis(cfg.refresh_interval_ms.max(1));

    loop {
        let input = crossbeam_channel::select! {
            recv(commands) -> line => Some(line),
            default(idle) => None,
        };
        match input {
            // End of input.
            Some(Err(_)) => break,
            Some(Ok(line)) if !line.trim().is_empty() => match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(cmd) => run(&scene, &cfg, cmd),
                Err(e) => println!("error: {e}"),
            },
            _ => {}
        }
        surface::pump(&scene, &events, present);
    }

    surface::pump(&scene, &events, present);
    refresher.stop();
    tracing::info!("agent exiting");
    Ok(())
}

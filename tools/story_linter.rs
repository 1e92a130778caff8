/// Story Linter: validates a story file and reports authoring issues.
///
/// Usage: story_linter <story.ron> [<story.ron> ...]
///
/// Construction errors (dangling destinations, malformed exits, unknown
/// affinity labels) are errors. Unreachable scenes, unused affinity labels,
/// speakers without sprites and single-option prompts are warnings.

use novella::core::graph::StoryGraph;
use novella::schema::scene::Exit;
use rustc_hash::FxHashSet;
use std::path::Path;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "novella=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: story_linter <story.ron> [<story.ron> ...]");
        process::exit(0);
    }

    let mut failed = false;
    for path in &args[1..] {
        println!("\n=== Story Lint Report: {} ===\n", path);
        match StoryGraph::load_from_ron(Path::new(path)) {
            Ok(graph) => {
                let warnings = lint_story(&graph);
                if warnings.is_empty() {
                    println!("All checks passed!");
                }
                for warning in &warnings {
                    println!("WARNING: {}", warning);
                }
                println!(
                    "\nSummary: '{}': {} scenes, {} endings, {} warnings",
                    graph.title(),
                    graph.len(),
                    graph.endings().count(),
                    warnings.len()
                );
            }
            Err(e) => {
                println!("ERROR: {}", e);
                failed = true;
            }
        }
    }

    process::exit(if failed { 1 } else { 0 });
}

fn lint_story(graph: &StoryGraph) -> Vec<String> {
    let mut warnings = Vec::new();

    let reachable = graph.reachable_from_start();
    for scene in graph.scenes() {
        if !reachable.contains(&scene.id) {
            warnings.push(format!("Scene '{}' is unreachable from '{}'", scene.id, graph.start()));
        }
    }

    if graph.endings().next().is_none() {
        warnings.push("Story has no ending scene".to_string());
    }

    let mut used_labels = FxHashSet::default();
    let mut unsprited = FxHashSet::default();
    for scene in graph.scenes() {
        if let Exit::Choices(choices) = &scene.exit {
            if choices.len() < 2 {
                warnings.push(format!(
                    "Scene '{}' offers only {} choice (consider an auto-advance instead)",
                    scene.id,
                    choices.len()
                ));
            }
            for choice in choices {
                used_labels.insert(choice.affinity.clone());
            }
        }
        for line in &scene.dialogue {
            if let Some(name) = line.speaker.name() {
                if !graph.sprites().contains(name) {
                    unsprited.insert(name.to_string());
                }
            }
        }
    }

    for label in graph.affinities() {
        if !used_labels.contains(label) {
            warnings.push(format!("Affinity '{}' is never awarded by any choice", label));
        }
    }

    let mut unsprited: Vec<String> = unsprited.into_iter().collect();
    unsprited.sort();
    for name in unsprited {
        warnings.push(format!("Speaker '{}' has no sprite", name));
    }

    warnings
}

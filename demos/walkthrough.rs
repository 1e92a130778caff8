/// Walkthrough example: plays the bundled story along a fixed route and
/// prints every presentation event, then does the same for a two-scene
/// story assembled in code with the builder.
///
/// Run with: cargo run --example walkthrough

use novella::core::controller::{Phase, PlaybackController};
use novella::core::events::{PresentationEvent, Stimulus};
use novella::core::graph::StoryGraph;
use novella::schema::scene::{Choice, DialogueLine, Exit, Scene};
use novella::stories;

fn main() {
    // --- Bundled story: always take the last option, side with Onyx at the hive ---
    let graph = stories::amari_bugs_out().expect("Failed to load bundled story");
    println!("=== {} ===\n", graph.title());
    walk(&graph, &[2, 2, 2, 2, 2, 2, 2, 0]);

    // --- A story built in code ---
    let graph = StoryGraph::builder()
        .title("Rooftop")
        .start("roof")
        .protagonist("Mara")
        .affinities(&["Brave", "Wary"])
        .sprite("Mara", "sprites/mara.png")
        .scene(Scene::new(
            "roof",
            "bg/roof.png",
            vec![
                DialogueLine::new("Mara", "The ledge is closer than it looks."),
                DialogueLine::narration("Wind pulls at her coat."),
            ],
            Exit::Choices(vec![
                Choice::new("Jump", "Brave", "landing"),
                Choice::new("Take the stairs", "Wary", "landing"),
            ]),
        ))
        .scene(Scene::new(
            "landing",
            "bg/street.png",
            vec![DialogueLine::new("Mara", "Either way, I made it down.")],
            Exit::Ending,
        ))
        .build()
        .expect("Failed to build rooftop story");
    println!("\n=== {} ===\n", graph.title());
    walk(&graph, &[0]);
}

fn walk(graph: &StoryGraph, route: &[usize]) {
    let mut ctl = PlaybackController::new(graph);
    let mut picks = route.iter().copied();

    print_events(&ctl.dispatch(Stimulus::StartPlaythrough).expect("start failed"));
    loop {
        let stimulus = match ctl.phase() {
            Phase::PlayingDialogue => Stimulus::Advance,
            Phase::AwaitingChoice => match picks.next() {
                Some(index) => Stimulus::SelectChoice(index),
                None => break,
            },
            _ => break,
        };
        println!("  >> {}", stimulus);
        print_events(&ctl.dispatch(stimulus).expect("stimulus rejected"));
    }

    if let Some(counters) = ctl.counters() {
        let scores: Vec<String> = counters
            .iter()
            .map(|(label, count)| format!("{}={}", label, count))
            .collect();
        println!("\nAffinity: {}", scores.join(", "));
        if let Some(leader) = counters.leading() {
            println!("Leaning toward: {}", leader);
        }
    }
}

fn print_events(events: &[PresentationEvent]) {
    for event in events {
        println!("{:?}", event);
    }
}

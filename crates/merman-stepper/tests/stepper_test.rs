use merman_stepper::{PanZoom, Stepper, StepperConfig, StepperEvent};
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn fixture(kind: &str, name: &str) -> String {
    let path = workspace_root().join("fixtures").join(kind).join(name);
    std::fs::read_to_string(&path).expect("fixture")
}

fn stepper() -> Stepper {
    Stepper::with_config(StepperConfig::default())
}

#[tokio::test(start_paused = true)]
async fn sequence_fixture_indexes_every_message() {
    let text = fixture("sequence", "basic.mmd");
    let mut stepper = stepper();
    stepper.set_attribute("text", &text).await;

    assert_eq!(stepper.generation(), 1);
    assert_eq!(stepper.total_steps(), 3);
    assert!(stepper.controls().panel_visible);
    assert_eq!(stepper.controls().stepper_max, 3);

    let surface = stepper.surface().expect("surface");
    assert!(surface.svg.contains(r#"id="mySvgId""#));
    assert!(!surface.svg.contains("max-width"));
    assert!(surface.view_box.is_some());

    let index = stepper.navigator().expect("navigator").index();
    let tops: Vec<f64> = index.iter().map(|(_, rect)| rect.min.y).collect();
    assert_eq!(index.iter().map(|(n, _)| n).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(tops.windows(2).all(|w| w[0] < w[1]), "steps out of order: {tops:?}");
}

#[tokio::test(start_paused = true)]
async fn stepping_frames_each_message_and_returns_home() {
    let text = fixture("sequence", "basic.mmd");
    let mut stepper = stepper();
    stepper.set_attribute("text", &text).await;

    for expected in 1..=3 {
        assert_eq!(stepper.move_next(), Some(expected));
        let viewport = stepper.viewport().expect("viewport");
        let rect = *stepper.navigator().unwrap().index().get(expected).unwrap();
        let visible = viewport.visible_box();
        assert!(visible.min.x <= rect.min.x && visible.max.x >= rect.max.x);
        assert!(visible.min.y <= rect.min.y && visible.max.y >= rect.max.y);
    }
    assert_eq!(stepper.move_next(), None);

    while stepper.current_step() > 0 {
        stepper.move_prev();
    }
    assert!(stepper.viewport().unwrap().transform().is_identity());
}

#[tokio::test(start_paused = true)]
async fn explicit_autonumber_keeps_its_labels() {
    let text = fixture("sequence", "autonumber_offset.mmd");
    let mut stepper = stepper();
    stepper.set_attribute("text", &text).await;

    assert_eq!(stepper.total_steps(), 2);
    assert_eq!(stepper.move_next(), None);
    assert_eq!(stepper.move_to(20), Some(20));
}

#[tokio::test(start_paused = true)]
async fn flowcharts_render_without_steps() {
    let mut stepper = stepper();
    stepper
        .set_attribute("text", &fixture("flowchart", "basic.mmd"))
        .await;
    assert_eq!(stepper.generation(), 1);
    assert!(!stepper.controls().panel_visible);
    assert_eq!(stepper.total_steps(), 0);

    // Switching to a sequence diagram replaces the index.
    stepper
        .set_attribute("text", &fixture("sequence", "basic.mmd"))
        .await;
    assert_eq!(stepper.generation(), 2);
    assert_eq!(stepper.total_steps(), 3);
}

#[tokio::test(start_paused = true)]
async fn unrenderable_text_raises_an_alert() {
    let mut stepper = stepper();
    let mut events = stepper.subscribe();
    stepper
        .set_attribute("text", "this is not a diagram")
        .await;

    assert_eq!(stepper.generation(), 0);
    assert!(stepper.surface().is_none());
    assert!(matches!(events.try_recv(), Ok(StepperEvent::Alert { .. })));
}

#[tokio::test(start_paused = true)]
async fn png_export_of_a_rendered_diagram() {
    let mut stepper = stepper();
    stepper
        .set_attribute("text", &fixture("sequence", "basic.mmd"))
        .await;

    let png = stepper.export_png().unwrap().expect("png");
    assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
}

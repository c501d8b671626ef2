use image::Rgb;

use crate::application::filter::FilterOutcome;
use crate::application::ports::Canvas;
use crate::domain::{
    config::DetectorConfig,
    detection::{BoundingBox, ClassifiedDetection},
    interaction::{help_lines, InteractionState},
    stats::SessionStats,
};

const TARGET_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const OTHER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const PAUSED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const PANEL_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const PANEL_ALPHA: f32 = 0.7;
const PANEL_ORIGIN: (i32, i32) = (10, 10);
const PANEL_MIN_SIZE: (u32, u32) = (390, 90);
const PADDING: i32 = 10;
const LINE_GAP: i32 = 8;
const BOX_THICKNESS: u32 = 2;
const LABEL_SCALE: u32 = 2;
const STATUS_SCALE: u32 = 2;
const HELP_SCALE: u32 = 1;
const HEADING_SCALE: u32 = 2;

/// Everything the overlay reads for one frame. Nothing here is mutated.
pub struct OverlayView<'a> {
    /// `None` while paused: no detections ran for this frame.
    pub detections: Option<&'a FilterOutcome>,
    pub state: InteractionState,
    pub config: &'a DetectorConfig,
    pub stats: &'a SessionStats,
}

struct PanelLine {
    text: String,
    color: Rgb<u8>,
    scale: u32,
}

#[derive(Default)]
pub struct OverlayRenderer;

impl OverlayRenderer {
    pub fn render(&self, canvas: &mut dyn Canvas, view: &OverlayView<'_>) {
        if let Some(outcome) = view.detections {
            for det in outcome.visible() {
                self.draw_detection(canvas, det);
            }
        }
        self.draw_panel(canvas, view);
    }

    fn draw_detection(&self, canvas: &mut dyn Canvas, det: &ClassifiedDetection) {
        let color = if det.is_target { TARGET_COLOR } else { OTHER_COLOR };
        let bbox = det.detection.bbox;
        canvas.stroke_rect(bbox, color, BOX_THICKNESS);

        let label = detection_label(det);
        let (_, h) = canvas.text_size(&label, LABEL_SCALE);
        let y = (bbox.y1 - h as i32 - 4).max(0);
        canvas.text(bbox.x1, y, &label, color, LABEL_SCALE);
    }

    fn draw_panel(&self, canvas: &mut dyn Canvas, view: &OverlayView<'_>) {
        let lines = panel_lines(view);

        let mut width = PANEL_MIN_SIZE.0 as i32;
        let mut height = PADDING;
        for line in &lines {
            let (w, h) = canvas.text_size(&line.text, line.scale);
            width = width.max(w as i32 + 2 * PADDING);
            height += h as i32 + LINE_GAP;
        }
        height = height.max(PANEL_MIN_SIZE.1 as i32);

        let (x0, y0) = PANEL_ORIGIN;
        let (canvas_w, _) = canvas.dimensions();
        width = width.min((canvas_w as i32 - x0).max(0));
        canvas.shade_rect(
            BoundingBox::new(x0, y0, x0 + width, y0 + height),
            PANEL_COLOR,
            PANEL_ALPHA,
        );

        let mut y = y0 + PADDING;
        for line in &lines {
            canvas.text(x0 + PADDING, y, &line.text, line.color, line.scale);
            let (_, h) = canvas.text_size(&line.text, line.scale);
            y += h as i32 + LINE_GAP;
        }
    }
}

pub fn detection_label(det: &ClassifiedDetection) -> String {
    let mut label = format!("{} {:.2}", det.label(), det.confidence());
    if det.is_target {
        label.push_str(" [TARGET]");
    }
    label
}

fn panel_lines(view: &OverlayView<'_>) -> Vec<PanelLine> {
    let status = |text: String| PanelLine { text, color: TEXT_COLOR, scale: STATUS_SCALE };
    let mut lines = vec![
        status(format!("Target: {}", view.config.target_classes().join(", "))),
        status(format!("Confidence: {:.2}", view.config.confidence_threshold())),
        status(format!("Detections: {}", view.stats.target())),
    ];
    if view.state.paused {
        lines.push(PanelLine { text: "PAUSED".into(), color: PAUSED_COLOR, scale: STATUS_SCALE });
    }
    if view.state.help_visible {
        lines.push(PanelLine { text: "Controls:".into(), color: TEXT_COLOR, scale: HEADING_SCALE });
        lines.extend(
            help_lines()
                .into_iter()
                .map(|text| PanelLine { text, color: TEXT_COLOR, scale: HELP_SCALE }),
        );
    }
    lines
}

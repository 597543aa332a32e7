#![forbid(unsafe_code)]

//! Read-only inspection and small rewrites of rendered SVG markup.

use crate::geom::{DiagramBox, DiagramTransform, ViewBox, diagram_box, transform_box};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::warn;

/// Class Mermaid puts on the numbered label of each sequence message.
pub const STEP_MARKER_CLASS: &str = "sequenceNumber";

const DEFAULT_FONT_SIZE: f64 = 16.0;
// Average glyph advance and vertical metrics relative to the font size.
const GLYPH_ADVANCE: f64 = 0.6;
const ASCENT: f64 = 0.8;
const DESCENT: f64 = 0.2;

static MAX_WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[ ]*max-width:[ 0-9.]*px;").expect("valid regex"));
static TEXT_ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text\b([^>]*)>(.*?)</text>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// One numbered step label found in a rendered diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct StepMarker {
    pub step: u32,
    /// Bounds of the label in diagram coordinates, parent transforms applied.
    pub rect: DiagramBox,
}

/// Removes the first `max-width: <n>px;` declaration Mermaid puts on the root element, so the
/// diagram can grow with its container.
pub fn strip_max_width(svg: &str) -> String {
    MAX_WIDTH_RE.replacen(svg, 1, "").into_owned()
}

/// Parses the root `viewBox` (`minX minY w h`).
///
/// Cheap, non-validating lookup of the first `viewBox` attribute, which is the root one for
/// Mermaid output. Returns `None` for missing or degenerate boxes.
pub fn parse_view_box(svg: &str) -> Option<ViewBox> {
    let (start, end) = view_box_value_range(svg)?;
    let vb = svgtypes::ViewBox::from_str(&svg[start..end]).ok()?;
    let usable =
        [vb.x, vb.y, vb.w, vb.h].iter().all(|v| v.is_finite()) && vb.w > 0.0 && vb.h > 0.0;
    usable.then_some(ViewBox {
        min_x: vb.x,
        min_y: vb.y,
        width: vb.w,
        height: vb.h,
    })
}

/// Returns `svg` with its root `viewBox` replaced by `frame`.
///
/// This is how a viewport position is baked into a standalone SVG document.
pub fn with_view_box(svg: &str, frame: &DiagramBox) -> String {
    let value = format!(
        "{} {} {} {}",
        fmt_number(frame.min.x),
        fmt_number(frame.min.y),
        fmt_number(frame.width()),
        fmt_number(frame.height())
    );
    if let Some((start, end)) = view_box_value_range(svg) {
        let mut out = String::with_capacity(svg.len() + value.len());
        out.push_str(&svg[..start]);
        out.push_str(&value);
        out.push_str(&svg[end..]);
        return out;
    }
    match svg.find("<svg") {
        Some(i) => {
            let insert_at = i + "<svg".len();
            format!(
                "{} viewBox=\"{}\"{}",
                &svg[..insert_at],
                value,
                &svg[insert_at..]
            )
        }
        None => svg.to_string(),
    }
}

fn view_box_value_range(svg: &str) -> Option<(usize, usize)> {
    let key = "viewBox=\"";
    let i = svg.find(key)?;
    let start = i + key.len();
    let end = start + svg[start..].find('"')?;
    Some((start, end))
}

fn fmt_number(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

/// Finds every step marker in `svg`.
///
/// Markers are `<text class="sequenceNumber">N</text>` elements. Labels that are not a
/// non-negative integer are skipped. When the markup is not well-formed XML (HTML labels inside
/// `<foreignObject>` can carry entities XML does not know), a tolerant scan without transform
/// support is used instead.
pub fn scan_step_markers(svg: &str) -> Vec<StepMarker> {
    match roxmltree::Document::parse(svg) {
        Ok(doc) => scan_document(&doc),
        Err(err) => {
            warn!(error = %err, "rendered SVG is not well-formed XML; using tolerant marker scan");
            scan_tolerant(svg)
        }
    }
}

fn scan_document(doc: &roxmltree::Document<'_>) -> Vec<StepMarker> {
    let mut markers = Vec::new();
    for node in doc.descendants() {
        if !node.is_element()
            || !node.has_tag_name("text")
            || !has_marker_class(node.attribute("class"))
        {
            continue;
        }
        let label: String = node
            .descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect();
        let Ok(step) = label.trim().parse::<u32>() else {
            continue;
        };

        let x = node.attribute("x").and_then(first_number).unwrap_or(0.0);
        let y = node.attribute("y").and_then(first_number).unwrap_or(0.0);
        let font_size = inherited(node, "font-size")
            .and_then(|v| parse_font_size(&v))
            .unwrap_or(DEFAULT_FONT_SIZE);
        let anchor = inherited(node, "text-anchor").unwrap_or_default();
        let local = estimate_text_box(x, y, font_size, anchor.trim(), label.trim());

        let mut transform = DiagramTransform::identity();
        for el in node.ancestors().filter(|n| n.is_element()) {
            if let Some(t) = el.attribute("transform").and_then(parse_transform) {
                transform = transform.then(&t);
            }
        }

        markers.push(StepMarker {
            step,
            rect: transform_box(&transform, &local),
        });
    }
    markers
}

fn scan_tolerant(svg: &str) -> Vec<StepMarker> {
    let mut markers = Vec::new();
    for caps in TEXT_ELEMENT_RE.captures_iter(svg) {
        let attrs = &caps[1];
        if !has_marker_class(raw_attribute(attrs, "class")) {
            continue;
        }
        let label = TAG_RE.replace_all(&caps[2], "");
        let Ok(step) = label.trim().parse::<u32>() else {
            continue;
        };
        let x = raw_attribute(attrs, "x").and_then(first_number).unwrap_or(0.0);
        let y = raw_attribute(attrs, "y").and_then(first_number).unwrap_or(0.0);
        let font_size = raw_attribute(attrs, "font-size")
            .and_then(parse_font_size)
            .unwrap_or(DEFAULT_FONT_SIZE);
        let anchor = raw_attribute(attrs, "text-anchor").unwrap_or("start");
        markers.push(StepMarker {
            step,
            rect: estimate_text_box(x, y, font_size, anchor, label.trim()),
        });
    }
    markers
}

fn has_marker_class(class: Option<&str>) -> bool {
    class.is_some_and(|c| c.split_whitespace().any(|c| c == STEP_MARKER_CLASS))
}

fn raw_attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{name}=\"");
    let mut search = 0;
    while let Some(rel) = attrs[search..].find(&needle) {
        let i = search + rel;
        // Reject matches inside longer names (`dx=` for `x=`).
        let preceded_ok = attrs[..i]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace());
        let start = i + needle.len();
        if preceded_ok {
            let end = start + attrs[start..].find('"')?;
            return Some(&attrs[start..end]);
        }
        search = start;
    }
    None
}

/// Looks a presentation property up on the node, then its ancestors (attribute or inline style).
fn inherited(node: roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    node.ancestors().filter(|n| n.is_element()).find_map(|n| {
        if let Some(v) = n.attribute(name) {
            return Some(v.to_string());
        }
        n.attribute("style").and_then(|style| style_property(style, name))
    })
}

fn style_property(style: &str, name: &str) -> Option<String> {
    style.split(';').find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

fn first_number(list: &str) -> Option<f64> {
    list.split(|c: char| c.is_whitespace() || c == ',')
        .find(|s| !s.is_empty())?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_font_size(raw: &str) -> Option<f64> {
    let length = svgtypes::Length::from_str(raw.trim()).ok()?;
    let px = match length.unit {
        svgtypes::LengthUnit::Em => length.number * DEFAULT_FONT_SIZE,
        svgtypes::LengthUnit::Pt => length.number * 4.0 / 3.0,
        _ => length.number,
    };
    (px.is_finite() && px > 0.0).then_some(px)
}

fn parse_transform(raw: &str) -> Option<DiagramTransform> {
    let t = svgtypes::Transform::from_str(raw).ok()?;
    Some(DiagramTransform::new(t.a, t.b, t.c, t.d, t.e, t.f))
}

fn estimate_text_box(x: f64, y: f64, font_size: f64, anchor: &str, label: &str) -> DiagramBox {
    let chars = label.chars().count().max(1) as f64;
    let width = chars * GLYPH_ADVANCE * font_size;
    let left = match anchor {
        "middle" => x - width / 2.0,
        "end" => x - width,
        _ => x,
    };
    diagram_box(
        left,
        y - ASCENT * font_size,
        left + width,
        y + DESCENT * font_size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQUENCE_SVG: &str = r#"<svg id="mySvgId" width="100%" xmlns="http://www.w3.org/2000/svg" style="max-width: 650px; background-color: white;" viewBox="-50 -10 650 400">
<g>
<line x1="75" y1="110" x2="75" y2="110" stroke-width="0" marker-start="url(#sequencenumber)"/>
<text x="75" y="114" font-family="sans-serif" font-size="12px" text-anchor="middle" class="sequenceNumber">1</text>
</g>
<g transform="translate(100, 50)">
<text x="75" y="114" font-size="12px" text-anchor="middle" class="sequenceNumber">2</text>
</g>
<text x="10" y="20" class="messageText">not a step</text>
<text x="0" y="0" class="sequenceNumber">n/a</text>
</svg>"#;

    #[test]
    fn strips_only_the_first_max_width() {
        let svg = r#"<svg style="max-width: 650.5px; background-color: white;"><g style="MAX-WIDTH:10px;"/></svg>"#;
        let out = strip_max_width(svg);
        assert_eq!(
            out,
            r#"<svg style=" background-color: white;"><g style="MAX-WIDTH:10px;"/></svg>"#
        );
    }

    #[test]
    fn parses_root_view_box() {
        let vb = parse_view_box(SEQUENCE_SVG).unwrap();
        assert_eq!(
            vb,
            ViewBox {
                min_x: -50.0,
                min_y: -10.0,
                width: 650.0,
                height: 400.0
            }
        );
        assert!(parse_view_box(r#"<svg viewBox="0 0 0 10"/>"#).is_none());
        assert!(parse_view_box("<svg/>").is_none());
    }

    #[test]
    fn scans_markers_and_applies_parent_transforms() {
        let markers = scan_step_markers(SEQUENCE_SVG);
        assert_eq!(markers.len(), 2);

        assert_eq!(markers[0].step, 1);
        let r = markers[0].rect;
        assert!((r.center().x - 75.0).abs() < 1e-9);
        assert!((r.width() - 7.2).abs() < 1e-9);
        assert!((r.min.y - (114.0 - 9.6)).abs() < 1e-9);
        assert!((r.max.y - (114.0 + 2.4)).abs() < 1e-9);

        assert_eq!(markers[1].step, 2);
        let shifted = markers[1].rect;
        assert!((shifted.center().x - 175.0).abs() < 1e-9);
        assert!((shifted.min.y - (164.0 - 9.6)).abs() < 1e-9);
    }

    #[test]
    fn font_size_is_inherited_from_ancestors() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><g style="font-size: 20px"><text x="0" y="0" class="sequenceNumber">12</text></g></svg>"#;
        let markers = scan_step_markers(svg);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].step, 12);
        assert!((markers[0].rect.width() - 24.0).abs() < 1e-9);
        assert_eq!(markers[0].rect.min.x, 0.0);
    }

    #[test]
    fn falls_back_to_tolerant_scan_for_html_entities() {
        let svg = r#"<svg viewBox="0 0 10 10"><foreignObject><div>a&nbsp;b</div></foreignObject><text dx="5" x="40" y="50" font-size="12px" text-anchor="middle" class="sequenceNumber">3</text></svg>"#;
        let markers = scan_step_markers(svg);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].step, 3);
        assert!((markers[0].rect.center().x - 40.0).abs() < 1e-9);
    }

    #[test]
    fn rewrites_or_inserts_view_box() {
        let frame = diagram_box(10.0, 20.5, 110.0, 70.25);
        let out = with_view_box(r#"<svg viewBox="0 0 5 5"><g/></svg>"#, &frame);
        assert_eq!(out, r#"<svg viewBox="10 20.5 100 49.75"><g/></svg>"#);

        let out = with_view_box(r#"<svg width="5"/>"#, &frame);
        assert_eq!(out, r#"<svg viewBox="10 20.5 100 49.75" width="5"/>"#);
    }
}

/// Parses a level point such as `"12,-4"` or `"{12, -4}"`.
pub(crate) fn parse_point(raw: &str) -> Option<Vec2> {
    let inner = raw
        .trim()
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(raw.trim());
    let (x, y) = inner.split_once(',')?;
    let x = x.trim().parse::<f32>().ok()?;
    let y = y.trim().parse::<f32>().ok()?;
    (x.is_finite() && y.is_finite()).then_some(Vec2::new(x, y))
}

/// Reads `position` as a point string, or falls back to numeric `x`/`y`.
fn record_position(record: &Map<String, Value>) -> Option<Vec2> {
    if let Some(raw) = record.get("position").and_then(Value::as_str) {
        return parse_point(raw);
    }
    let x = record.get("x").and_then(Value::as_f64)?;
    let y = record.get("y").and_then(Value::as_f64)?;
    let point = Vec2::new(x as f32, y as f32);
    (point.x.is_finite() && point.y.is_finite()).then_some(point)
}

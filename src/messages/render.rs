/// Substitute `${i}` placeholders with `params[i]` in one left-to-right pass.
///
/// Placeholders without a matching parameter stay as written, extra
/// parameters are ignored, and substituted text is never scanned again.
pub fn render<S: AsRef<str>>(template: &str, params: &[S]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let substituted = after.find('}').and_then(|end| {
            let index = &after[..end];
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let value = index.parse::<usize>().ok().and_then(|i| params.get(i))?;
            Some((value.as_ref(), end))
        });

        match substituted {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

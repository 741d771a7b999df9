//! Parse the "导演: ... 主演: ..." credits line into ordered name lists.

const DIRECTOR_LABEL: &str = "导演:";
const ACTOR_LABEL: &str = "主演:";

/// Split a credits line into (directors, actors), both in credit order.
///
/// The actor segment is optional; a line without the director label is
/// treated as a bare director list.
pub fn parse_credits(line: &str) -> (Vec<String>, Vec<String>) {
    let rest = match line.find(DIRECTOR_LABEL) {
        Some(idx) => &line[idx + DIRECTOR_LABEL.len()..],
        None => line,
    };
    let (director_part, actor_part) = match rest.find(ACTOR_LABEL) {
        Some(idx) => (&rest[..idx], &rest[idx + ACTOR_LABEL.len()..]),
        None => (rest, ""),
    };
    (split_names(director_part), split_names(actor_part))
}

fn split_names(part: &str) -> Vec<String> {
    part.split('/')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

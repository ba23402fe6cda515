use anyhow::Result;
use codeatlas_core::{EdgeKey, NodeKey, Selectable, Vec2};
use codeatlas_scene::ExpandQuery;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(NodeKey),
    Edge(NodeKey, NodeKey),
    Link(NodeKey, NodeKey),
    Select(Selectable),
    Nav(Vec2),
    Refs(ExpandQuery),
    Del,
    Deny,
    Allow(NodeKey),
    Comment(String),
    Save(String),
    Show { name: String, select: bool },
    Drop(String),
    Status,
    Quit,
}

fn direction(word: &str) -> Option<Vec2> {
    match word {
        "left" => Some(Vec2::new(-1.0, 0.0)),
        "right" => Some(Vec2::new(1.0, 0.0)),
        "up" => Some(Vec2::new(0.0, -1.0)),
        "down" => Some(Vec2::new(0.0, 1.0)),
        _ => None,
    }
}

fn float(word: &str) -> Result<f32> {
    word.parse()
        .map_err(|_| anyhow::anyhow!("expected a number, got {word:?}"))
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let cmd = match (verb, args.as_slice()) {
            ("add", [key]) => Self::Add(NodeKey::from(*key)),
            ("edge", [src, tar]) => Self::Edge(NodeKey::from(*src), NodeKey::from(*tar)),
            ("link", [src, tar]) => Self::Link(NodeKey::from(*src), NodeKey::from(*tar)),
            ("select", [key]) => Self::Select(Selectable::Node(NodeKey::from(*key))),
            ("select", [src, tar]) => Self::Select(Selectable::Edge(EdgeKey::new(*src, *tar))),
            ("nav", [word]) => match direction(word) {
                Some(dir) => Self::Nav(dir),
                None => anyhow::bail!("unknown direction: {word}"),
            },
            ("nav", [x, y]) => Self::Nav(Vec2::new(float(x)?, float(y)?).normalize_or_zero()),
            ("refs", [ref_kind, entity_kind, extra @ ..]) => {
                let mut query = ExpandQuery {
                    ref_kind: ref_kind.to_string(),
                    entity_kind: entity_kind.to_string(),
                    inverse: false,
                    max_count: None,
                };
                for word in extra {
                    if *word == "inverse" {
                        query.inverse = true;
                    } else {
                        let max: usize = word
                            .parse()
                            .map_err(|_| anyhow::anyhow!("unexpected refs argument: {word}"))?;
                        query.max_count = Some(max);
                    }
                }
                Self::Refs(query)
            }
            ("del", []) => Self::Del,
            ("deny", []) => Self::Deny,
            ("allow", [key]) => Self::Allow(NodeKey::from(*key)),
            ("comment", _) => Self::Comment(rest.to_string()),
            ("save", [name]) => Self::Save(name.to_string()),
            ("show", [name]) => Self::Show {
                name: name.to_string(),
                select: true,
            },
            ("show", [name, "keep"]) => Self::Show {
                name: name.to_string(),
                select: false,
            },
            ("drop", [name]) => Self::Drop(name.to_string()),
            ("status", []) => Self::Status,
            ("quit", []) | ("exit", []) => Self::Quit,
            _ => anyhow::bail!("unrecognized command: {line}"),
        };
        Ok(cmd)
    }
}

use anyhow::Result;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentArgs {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub lru: Option<usize>,
}

pub fn parse_args() -> Result<AgentArgs> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<AgentArgs>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out = AgentArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--config" {
            let Some(path) = args.next() else {
                anyhow::bail!("--config expects a path");
            };
            out.config = Some(PathBuf::from(path));
        } else if arg == "--db" {
            let Some(path) = args.next() else {
                anyhow::bail!("--db expects a path");
            };
            out.db = Some(PathBuf::from(path));
        } else if arg == "--lru" {
            let Some(value) = args.next() else {
                anyhow::bail!("--lru expects a number");
            };
            let value = value.to_string_lossy();
            let cap: usize = value
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid --lru value: {value}"))?;
            out.lru = Some(cap);
        } else {
            anyhow::bail!("unknown argument: {:?}", arg);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn parses_all_flags() {
        let args = parse_args_from(os(&["--db", "refs.json", "--lru", "12", "--config", "a.toml"]))
            .expect("args parsed");
        assert_eq!(args.db, Some(PathBuf::from("refs.json")));
        assert_eq!(args.lru, Some(12));
        assert_eq!(args.config, Some(PathBuf::from("a.toml")));
    }

    #[test]
    fn no_flags_means_defaults() {
        assert_eq!(parse_args_from(os(&[])).expect("args"), AgentArgs::default());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args_from(os(&["--lru", "lots"])).is_err());
        assert!(parse_args_from(os(&["--db"])).is_err());
        assert!(parse_args_from(os(&["--verbose"])).is_err());
    }
}

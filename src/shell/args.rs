use std::collections::HashMap;

/// Single-dash startup flags, e.g. `-dev-tools` or `-profile=work`.
///
/// Arguments starting with `--` belong to the framework and are skipped, as
/// is anything not starting with a dash. A flag with an empty name (`-` or
/// `-=value`) is ignored. When a flag repeats, the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupArgs {
    flags: HashMap<String, Option<String>>,
}

impl StartupArgs {
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = HashMap::new();

        for arg in args {
            let arg = arg.as_ref();
            let Some(flag) = arg.strip_prefix('-') else {
                continue;
            };
            if flag.starts_with('-') {
                continue;
            }

            match flag.split_once('=') {
                Some((name, value)) if !name.is_empty() => {
                    flags.insert(name.to_string(), Some(value.to_string()));
                }
                Some(_) => {}
                None if !flag.is_empty() => {
                    flags.insert(flag.to_string(), None);
                }
                None => {}
            }
        }

        Self { flags }
    }

    /// Whether the flag was passed, with or without a value.
    pub fn has(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.flags.get(name)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let args = StartupArgs::parse([
            "/opt/app/shell",
            "-dev-tools",
            "-profile=work",
            "--inspect=9229",
            "-=orphan",
            "-",
            "plain",
            "-url=a=b",
        ]);

        assert!(args.has("dev-tools"));
        assert_eq!(args.value("dev-tools"), None);
        assert_eq!(args.value("profile"), Some("work"));
        assert_eq!(args.value("url"), Some("a=b"));
        assert!(!args.has("inspect"));
        assert!(!args.has("-inspect"));
        assert!(!args.has("plain"));
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_last_wins() {
        let args = StartupArgs::parse(["-mode=a", "-mode=b", "-flag=x", "-flag"]);
        assert_eq!(args.value("mode"), Some("b"));
        assert!(args.has("flag"));
        assert_eq!(args.value("flag"), None);
    }

    #[test]
    fn test_empty_value() {
        let args = StartupArgs::parse(["-name="]);
        assert_eq!(args.value("name"), Some(""));
    }
}

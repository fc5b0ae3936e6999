use std::path::Path;

/// Name of the running executable, without directory or extension.
pub fn current_process_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| stem(&p))
        .or_else(|| std::env::args_os().next().and_then(|a| stem(Path::new(&a))))
        .unwrap_or_else(|| format!("pid-{}", std::process::id()))
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    #[test]
    fn process_name_is_never_empty() {
        assert!(!super::current_process_name().is_empty());
    }
}

use std::path::Path;

/// Named build stages of a multi-stage Dockerfile, in declaration order.
///
/// A stage is declared by `FROM [--flags] <image> AS <name>`. Keywords are
/// matched case-insensitively and names are lowercased, as docker does.
/// A name declared twice is reported once.
///
/// # Examples
///
/// ```
/// use autodeploy_build::dockerfile::discover_stages;
///
/// let dockerfile = "\
/// FROM rust:1.84 AS builder
/// RUN cargo build --release
///
/// FROM debian:bookworm-slim
/// COPY --from=builder /app/target/release/app /usr/local/bin/app
/// ";
/// assert_eq!(discover_stages(dockerfile), vec!["builder"]);
/// ```
pub fn discover_stages(content: &str) -> Vec<String> {
    let mut stages: Vec<String> = Vec::new();

    for line in content.lines() {
        let Some(name) = stage_name(line) else {
            continue;
        };
        if !stages.contains(&name) {
            stages.push(name);
        }
    }

    stages
}

fn stage_name(line: &str) -> Option<String> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }

    let mut tokens = line.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("FROM") {
        return None;
    }

    // Flags such as `--platform=$BUILDPLATFORM` precede the image.
    let mut tokens = tokens.skip_while(|t| t.starts_with("--"));
    let _image = tokens.next()?;
    let keyword = tokens.next()?;
    if !keyword.eq_ignore_ascii_case("AS") {
        return None;
    }
    tokens.next().map(|name| name.to_ascii_lowercase())
}

/// Read a Dockerfile and discover its named stages.
pub fn read_stages(path: &Path) -> Result<Vec<String>, StageError> {
    let content = std::fs::read_to_string(path).map_err(|e| StageError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let stages = discover_stages(&content);
    tracing::debug!(path = %path.display(), stages = ?stages, "discovered build stages");
    Ok(stages)
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("failed to read Dockerfile at {path}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

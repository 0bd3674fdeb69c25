//! Command: render standard input with the configuration as context.
use std::io::{Read, Write};

use minijinja::Value;

use crate::cli::Cli;
use crate::error::{StdinError, TmplError};
use crate::logging::Logger;

use super::{RunSetup, prepare};

/// Render everything readable from `input` and write the result to
/// `output`, followed by a newline.
///
/// # Errors
///
/// Returns [`TmplError::Stdin`] if reading, rendering, or writing fails, or
/// the error of the configuration stage that failed first.
pub fn execute(
    setup: &RunSetup,
    cli: &Cli,
    input: &mut dyn Read,
    output: &mut dyn Write,
    log: &Logger,
) -> Result<(), TmplError> {
    let (doc, engine) = prepare(setup, cli, log)?;

    log.stage("Rendering standard input...");
    let mut source = String::new();
    input
        .read_to_string(&mut source)
        .map_err(StdinError::Read)?;

    let rendered = engine.render_source(&source, &Value::from_serialize(doc.context()))?;
    writeln!(output, "{rendered}")
        .and_then(|()| output.flush())
        .map_err(|source| StdinError::Write { source })?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::host::HostInfo;
    use clap::Parser as _;
    use std::path::Path;

    fn setup(dir: &Path, conf: &str) -> (RunSetup, Cli) {
        std::fs::write(dir.join("tmpl.yaml"), conf).unwrap();
        let cli = Cli::try_parse_from([
            "tmpl",
            dir.join("tmpl.yaml").to_str().unwrap(),
            "--stdin",
        ])
        .unwrap();
        let setup = RunSetup::init(
            &cli,
            HostInfo::new("web01", "web01.example.com"),
            &Logger::default(),
        )
        .unwrap();
        (setup, cli)
    }

    #[test]
    fn renders_input_with_configuration_context() {
        let dir = tempfile::tempdir().unwrap();
        let (setup, cli) = setup(dir.path(), "name: web\nports: [80, 443]\n");
        let mut input: &[u8] = b"{{ name }}@{{ hostname }}:{{ ports | join(',') }}";
        let mut output = Vec::new();

        execute(&setup, &cli, &mut input, &mut output, &Logger::default()).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "web@web01:80,443\n");
    }

    #[test]
    fn render_failure_is_a_stdin_error() {
        let dir = tempfile::tempdir().unwrap();
        let (setup, cli) = setup(dir.path(), "name: web\n");
        let mut input: &[u8] = b"line one\n{{ raise('nope') }}";
        let mut output = Vec::new();

        let err =
            execute(&setup, &cli, &mut input, &mut output, &Logger::default()).unwrap_err();
        assert_eq!(err.exit_code(), 11);
        assert!(err.to_string().contains("nope"), "{err}");
        assert!(output.is_empty());
    }
}

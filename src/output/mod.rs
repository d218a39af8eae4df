// Output module
// Writes ticket information, test cases and generated code to disk


use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::Result;

/// Everything a run produced for one ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedOutput {
    pub ticket: String,
    pub ticket_info: String,
    /// `None` when test case generation was skipped
    pub test_cases: Option<String>,
    /// `None` when code generation was skipped
    pub code: Option<String>,
}

/// Remove markdown code fences so the file compiles as TypeScript
#[inline]
pub fn strip_code_fences(code: &str) -> String {
    code.replace("```typescript\n", "").replace("```", "")
}

/// Path prefix shared by every file written for `ticket`
#[inline]
pub fn output_base(output_dir: &Path, ticket: &str) -> PathBuf {
    output_dir.join(ticket.to_lowercase())
}

/// Write the run's files under `output_dir` and return their paths.
///
/// The test-cases file always exists; with `split` the code goes to a
/// separate `.test.ts` file instead of being appended to it.
#[inline]
pub fn write_output(
    output_dir: &Path,
    output: &GeneratedOutput,
    split: bool,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    let base = output_base(output_dir, &output.ticket);
    let test_cases_path = with_suffix(&base, "-test-cases.txt");

    let contents = render_text_file(output, split);

    let mut written = vec![test_cases_path.clone()];
    let mut code_path = None;

    if let Some(code) = output.code.as_deref().filter(|_| split) {
        let path = with_suffix(&base, "-code.test.ts");
        write_file(&path, &strip_code_fences(code))?;
        code_path = Some(path.clone());
        written.push(path);
    }

    write_file(&test_cases_path, &contents)?;

    if output.test_cases.is_some() {
        info!(
            "Test cases for {} saved to '{}'",
            output.ticket,
            test_cases_path.display()
        );
    } else {
        info!(
            "Test information for {} saved to '{}'",
            output.ticket,
            test_cases_path.display()
        );
    }

    if output.code.is_some() {
        let path = code_path.as_deref().unwrap_or(&test_cases_path);
        info!("Code for {} saved to '{}'", output.ticket, path.display());
    }

    Ok(written)
}

/// Contents of the `-test-cases.txt` file; code is inlined unless `split`
#[inline]
pub fn render_text_file(output: &GeneratedOutput, split: bool) -> String {
    let mut sections = vec![format!(
        "{}:\n---------\n{}\n",
        output.ticket, output.ticket_info
    )];

    if let Some(test_cases) = &output.test_cases {
        sections.push(format!("\nTest Cases:\n-----------\n{test_cases}\n"));
    }

    if let Some(code) = output.code.as_deref().filter(|_| !split) {
        sections.push(format!("\nCode:\n-----\n{code}\n"));
    }

    sections.concat()
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    Ok(())
}

use super::{Engine, types::ToolDiag};
use crate::{config::Config, util::ensure_dir};
use anyhow::{Context, Result, anyhow};
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Runs poppler (`pdftoppm`, `pdftotext`) and `tesseract` as child processes.
pub struct ExternalEngine {
    pdftoppm: PathBuf,
    pdftotext: PathBuf,
    tesseract: PathBuf,
    work_dir: PathBuf,
    timeout: Option<Duration>,
}

impl ExternalEngine {
    pub fn new(cfg: &Config) -> Self {
        let timeout = if cfg.tools.timeout_seconds > 0 {
            Some(Duration::from_secs(cfg.tools.timeout_seconds))
        } else {
            None
        };
        Self {
            pdftoppm: expand_tilde(&cfg.tools.pdftoppm),
            pdftotext: expand_tilde(&cfg.tools.pdftotext),
            tesseract: expand_tilde(&cfg.tools.tesseract),
            work_dir: cfg.work_dir(),
            timeout,
        }
    }

    fn run(&self, program: &Path, args: &[&OsStr]) -> Result<Output> {
        debug!("exec {} {:?} timeout={:?}", program.display(), args, self.timeout);
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", program.display()))?;

        let output = match self.timeout {
            Some(timeout) => wait_with_timeout(program, &mut child, timeout)?,
            None => child
                .wait_with_output()
                .with_context(|| format!("waiting for {}", program.display()))?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                stderr.trim()
            ));
        }

        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("{} stderr: {}", program.display(), stderr.trim());
        }

        Ok(output)
    }

    fn probe(&self, name: &str, program: &Path, flag: &str) -> ToolDiag {
        let mut diag = ToolDiag {
            name: name.to_string(),
            program: program.display().to_string(),
            ok: false,
            version: None,
            error: None,
        };
        match self.run(program, &[OsStr::new(flag)]) {
            Ok(out) => {
                // poppler prints its version banner on stderr
                let text = if out.stdout.is_empty() { out.stderr } else { out.stdout };
                diag.ok = true;
                diag.version = String::from_utf8_lossy(&text)
                    .lines()
                    .next()
                    .map(|l| l.trim().to_string());
            }
            Err(err) => diag.error = Some(format!("{err:#}")),
        }
        diag
    }
}

impl Engine for ExternalEngine {
    fn doctor(&self) -> Result<Vec<ToolDiag>> {
        Ok(vec![
            self.probe("pdftoppm", &self.pdftoppm, "-v"),
            self.probe("pdftotext", &self.pdftotext, "-v"),
            self.probe("tesseract", &self.tesseract, "--version"),
        ])
    }

    fn render_first_page(&self, pdf: &Path, scale: f32) -> Result<Vec<u8>> {
        ensure_dir(&self.work_dir)?;
        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".into());
        let prefix = self
            .work_dir
            .join(format!("{}-{}-p1", std::process::id(), stem));
        let dpi = dpi_for_scale(scale).to_string();

        self.run(
            &self.pdftoppm,
            &[
                OsStr::new("-png"),
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-f"),
                OsStr::new("1"),
                OsStr::new("-l"),
                OsStr::new("1"),
                OsStr::new("-singlefile"),
                pdf.as_os_str(),
                prefix.as_os_str(),
            ],
        )?;

        let mut png = prefix.into_os_string();
        png.push(".png");
        let png = PathBuf::from(png);
        let bytes = std::fs::read(&png)
            .with_context(|| format!("reading rendered page: {}", png.display()))?;
        if let Err(err) = std::fs::remove_file(&png) {
            warn!("could not remove {}: {err}", png.display());
        }
        if bytes.is_empty() {
            return Err(anyhow!("rendered page is empty: {}", pdf.display()));
        }
        Ok(bytes)
    }

    fn pdf_text(&self, pdf: &Path) -> Result<Vec<String>> {
        let out = self.run(
            &self.pdftotext,
            &[
                OsStr::new("-q"),
                OsStr::new("-enc"),
                OsStr::new("UTF-8"),
                pdf.as_os_str(),
                OsStr::new("-"),
            ],
        )?;
        Ok(split_pages(&String::from_utf8_lossy(&out.stdout)))
    }

    fn ocr_image(&self, image: &Path, lang: &str) -> Result<String> {
        let out = self.run(
            &self.tesseract,
            &[
                image.as_os_str(),
                OsStr::new("stdout"),
                OsStr::new("-l"),
                OsStr::new(lang),
            ],
        )?;
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

fn dpi_for_scale(scale: f32) -> u32 {
    (72.0 * scale.max(0.1)).round() as u32
}

/// pdftotext separates pages with form feeds; the last one is trailing.
fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw.split('\u{000C}').map(|p| p.to_string()).collect();
    while matches!(pages.last(), Some(last) if last.trim().is_empty()) {
        pages.pop();
    }
    pages
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Reads a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(reader: JoinHandle<std::io::Result<Vec<u8>>>, stream: &str) -> Result<Vec<u8>> {
    reader
        .join()
        .map_err(|_| anyhow!("{stream} reader panicked"))?
        .with_context(|| format!("reading {stream}"))
}

/// Polls `child` until it exits or `timeout` passes. Pipes are drained
/// concurrently; a full pipe would otherwise stall the tool.
fn wait_with_timeout(program: &Path, child: &mut Child, timeout: Duration) -> Result<Output> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            break status;
        }
        if Instant::now() >= deadline {
            warn!("{} still running after {:?}; killing it", program.display(), timeout);
            if let Err(err) = child.kill() {
                debug!("kill {}: {err}", program.display());
            }
            child.wait().with_context(|| "wait after kill")?;
            let stderr = collect(stderr, "stderr").unwrap_or_default();
            return Err(anyhow!(
                "{} timed out after {:?}: {}",
                program.display(),
                timeout,
                String::from_utf8_lossy(&stderr).trim()
            ));
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    Ok(Output {
        status,
        stdout: collect(stdout, "stdout")?,
        stderr: collect(stderr, "stderr")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_form_feed_pages_and_drops_trailing_blank() {
        let pages = split_pages("page one\n\u{000C}page two\n\u{000C}\n");
        assert_eq!(pages, vec!["page one\n".to_string(), "page two\n".to_string()]);
    }

    #[test]
    fn double_scale_is_144_dpi() {
        assert_eq!(dpi_for_scale(2.0), 144);
        assert_eq!(dpi_for_scale(1.0), 72);
    }

    #[cfg(unix)]
    fn spawn_sh(script: &str) -> Child {
        Command::new("sh")
            .args(["-c", script])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn sh")
    }

    #[cfg(unix)]
    #[test]
    fn collects_output_of_a_quick_tool() {
        let mut child = spawn_sh("echo page; echo warn >&2");
        let out = wait_with_timeout(Path::new("sh"), &mut child, Duration::from_secs(10))
            .expect("wait");
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout), "page\n");
        assert_eq!(String::from_utf8_lossy(&out.stderr), "warn\n");
    }

    #[cfg(unix)]
    #[test]
    fn kills_a_tool_that_overruns() {
        let mut child = spawn_sh("echo stuck >&2; exec sleep 30");
        let started = Instant::now();
        let err = wait_with_timeout(Path::new("sh"), &mut child, Duration::from_millis(200))
            .expect_err("timeout");
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(format!("{err:#}").contains("timed out"), "{err:#}");
    }
}

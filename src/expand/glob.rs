//! Pathname expansion: walk the virtual filesystem per pattern component.

use crate::interp::state::ShoptFlags;
use crate::interp::vfs_bridge::Host;
use crate::vfs::path as vpath;

use super::pattern::{self, PatternOpts};

/// Expand `pat` against the filesystem. Returns matches sorted; empty when
/// nothing matched (the caller applies nullglob/failglob/literal policy).
pub fn expand_glob(host: &Host, cwd: &str, pat: &str, shopts: &ShoptFlags) -> Vec<String> {
    let absolute = pat.starts_with('/');
    let dirs_only = pat.ends_with('/');
    let trimmed = pat.trim_matches('/');
    let components: Vec<&str> = trimmed.split('/').filter(|c| !c.is_empty()).collect();
    if components.is_empty() {
        return Vec::new();
    }

    let opts = PatternOpts { extglob: shopts.extglob, nocase: shopts.nocaseglob };

    // (absolute fs path, display path as the user wrote it)
    let start_fs = if absolute { "/".to_string() } else { cwd.to_string() };
    let start_display = if absolute { "/".to_string() } else { String::new() };
    let mut frontier: Vec<(String, String)> = vec![(start_fs, start_display)];

    for (ci, comp) in components.iter().enumerate() {
        let last = ci == components.len() - 1;
        let mut next: Vec<(String, String)> = Vec::new();
        for (dir, display) in &frontier {
            if *comp == "**" && shopts.globstar {
                // Zero or more directory levels.
                collect_globstar(host, dir, display, last, dirs_only, shopts, &mut next);
                continue;
            }
            if !pattern::has_glob_chars(comp) {
                let literal = unescape(comp);
                let full = vpath::absolutize(dir, &literal);
                let disp = join_display(display, &literal);
                if last {
                    if let Ok(meta) = host.stat(&full) {
                        if !dirs_only || meta.is_dir() {
                            next.push((full, disp));
                        }
                    }
                } else if host.is_dir(&full) {
                    next.push((full, disp));
                }
                continue;
            }
            let Ok(names) = host.readdir(dir) else { continue };
            for name in names {
                if name.starts_with('.') && !shopts.dotglob && !comp.starts_with('.') {
                    continue;
                }
                if !pattern::matches(comp, &name, opts) {
                    continue;
                }
                let full = vpath::join(dir, &name);
                let disp = join_display(display, &name);
                if last {
                    if !dirs_only || host.is_dir(&full) {
                        next.push((full, disp));
                    }
                } else if host.is_dir(&full) {
                    next.push((full, disp));
                }
            }
        }
        frontier = next;
        if frontier.is_empty() {
            return Vec::new();
        }
    }

    let mut out: Vec<String> = frontier
        .into_iter()
        .map(|(_, mut d)| {
            if dirs_only {
                d.push('/');
            }
            d
        })
        .collect();
    out.sort();
    out.dedup();
    out
}

/// `**`: the directory itself (zero levels) plus every descendant
/// directory; when `last`, every file underneath as well.
fn collect_globstar(
    host: &Host,
    dir: &str,
    display: &str,
    last: bool,
    dirs_only: bool,
    shopts: &ShoptFlags,
    out: &mut Vec<(String, String)>,
) {
    // The directory itself is the zero-level match.
    if !last || !display.is_empty() {
        out.push((dir.to_string(), display.to_string()));
    }
    let mut stack = vec![(dir.to_string(), display.to_string())];
    while let Some((d, disp)) = stack.pop() {
        let Ok(names) = host.readdir(&d) else { continue };
        for name in names {
            if name.starts_with('.') && !shopts.dotglob {
                continue;
            }
            let full = vpath::join(&d, &name);
            let dshow = join_display(&disp, &name);
            if host.is_dir(&full) {
                out.push((full.clone(), dshow.clone()));
                stack.push((full, dshow));
            } else if last && !dirs_only {
                out.push((full, dshow));
            }
        }
    }
}

fn join_display(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else if prefix == "/" {
        format!("/{name}")
    } else {
        format!("{prefix}/{name}")
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(n) = chars.next() {
                out.push(n);
            }
        } else {
            out.push(c);
        }
    }
    out
}

use ignore::WalkBuilder;
use nix::unistd::User;
#[cfg(test)]
use nix::unistd::{Gid, Uid};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use crate::error::StepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    /// Accepts a user name, `uid`, or `uid:gid`.
    pub fn parse(spec: &str) -> Result<Self, StepError> {
        let spec = spec.trim();
        let owner_err = |reason: &str| StepError::Owner {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        if spec.is_empty() {
            return Err(owner_err("empty owner"));
        }

        if spec.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            let (uid, gid) = match spec.split_once(':') {
                Some((uid, gid)) => (uid, gid),
                None => (spec, spec),
            };
            let uid = uid.parse().map_err(|_| owner_err("invalid uid"))?;
            let gid = gid.parse().map_err(|_| owner_err("invalid gid"))?;
            return Ok(Self { uid, gid });
        }

        lookup_user(spec)
    }

    #[cfg(test)]
    pub fn current() -> Self {
        Self {
            uid: Uid::current().as_raw(),
            gid: Gid::current().as_raw(),
        }
    }
}

fn lookup_user(name: &str) -> Result<Owner, StepError> {
    let owner_err = |reason: String| StepError::Owner {
        spec: name.to_string(),
        reason,
    };

    match User::from_name(name) {
        Ok(Some(user)) => Ok(Owner {
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
        }),
        Ok(None) => Err(owner_err("no such user".to_string())),
        Err(errno) => Err(owner_err(errno.desc().to_string())),
    }
}

/// Recursively assign `owner` to every entry under `roots`, without following
/// symlinks. Missing roots are skipped. Entries that cannot be re-owned do not
/// stop the walk; they are reported together once it finishes.
///
/// Returns the number of entries changed.
pub fn fix_ownership(owner: Owner, roots: &[PathBuf]) -> Result<usize, StepError> {
    let mut changed = 0;
    let mut failed = 0;
    let mut first_error = None;

    for root in roots {
        if !root.exists() {
            tracing::debug!("ownership: skipping missing {}", root.display());
            continue;
        }

        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .build();

        for entry in walker {
            let result = entry
                .map_err(|err| StepError::Io {
                    path: root.clone(),
                    source: io::Error::other(err),
                })
                .and_then(|entry| chown_if_needed(entry.path(), owner));

            match result {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!("ownership: {err}");
                    failed += 1;
                    first_error.get_or_insert(err);
                }
            }
        }
    }

    match first_error {
        Some(first) => Err(StepError::OwnershipIncomplete {
            failed,
            changed,
            first: Box::new(first),
        }),
        None => Ok(changed),
    }
}

fn chown_if_needed(path: &Path, owner: Owner) -> Result<bool, StepError> {
    let meta = std::fs::symlink_metadata(path).map_err(|err| StepError::io(path, err))?;
    if meta.uid() == owner.uid && meta.gid() == owner.gid {
        return Ok(false);
    }

    std::os::unix::fs::lchown(path, Some(owner.uid), Some(owner.gid))
        .map_err(|err| StepError::io(path, err))?;
    Ok(true)
}

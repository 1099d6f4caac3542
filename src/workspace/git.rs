use std::path::Path;

use git2::{
    BranchType, Cred, Direction, ErrorCode, IndexAddOption, PushOptions, RemoteCallbacks, Repository,
    RepositoryInitOptions, Signature, Status, StatusOptions,
};

use crate::error::{AppError, Result};

/// Validate a branch name to prevent argument injection.
/// Rejects names starting with `-` as defence in depth.
fn validate_branch_name(name: &str) -> Result<()> {
    if name.starts_with('-') {
        return Err(AppError::Git(format!(
            "Invalid branch name (starts with '-'): {name}"
        )));
    }
    Ok(())
}

/// Callbacks that authenticate with `token` via credential callback.
fn make_callbacks(token: &str) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username_from_url, _allowed_types| {
        Cred::userpass_plaintext("x-access-token", token)
    });
    callbacks
}

/// Build `PushOptions` that authenticate via credential callback and turn a
/// per-ref rejection from the server into an error.
fn make_push_options(token: &str) -> PushOptions<'_> {
    let mut callbacks = make_callbacks(token);
    callbacks.push_update_reference(|refname, status| match status {
        Some(reason) => Err(git2::Error::from_str(&format!(
            "remote rejected {refname}: {reason}"
        ))),
        None => Ok(()),
    });
    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);
    opts
}

/// Whether `remote` was added or had its URL replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteChange {
    Added,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { id: String },
    NothingToCommit,
}

/// Author used when the repository has no `user.name` / `user.email`.
#[derive(Debug, Clone)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// Open the repository at `dir`, or initialise one whose first branch is `branch`.
///
/// Returns true when a new repository was created. An existing repository
/// with no commits yet has its HEAD pointed at `branch`.
pub async fn ensure_repository(dir: &Path, branch: &str) -> Result<bool> {
    validate_branch_name(branch)?;

    let dir = dir.to_path_buf();
    let branch = branch.to_string();

    tokio::task::spawn_blocking(move || {
        if dir.join(".git").exists() {
            let repo = Repository::open(&dir)?;
            if repo.head_detached().unwrap_or(false) {
                return Ok(false);
            }
            if let Err(e) = repo.head() {
                if e.code() == ErrorCode::UnbornBranch {
                    repo.set_head(&format!("refs/heads/{branch}"))?;
                }
            }
            return Ok(false);
        }

        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(&branch);
        Repository::init_opts(&dir, &opts)?;
        Ok(true)
    })
    .await
    .map_err(|e| AppError::Git(format!("Init task panicked: {e}")))?
}

/// Point remote `name` at `url`, adding it when it does not exist.
pub async fn configure_remote(dir: &Path, name: &str, url: &str) -> Result<RemoteChange> {
    let dir = dir.to_path_buf();
    let name = name.to_string();
    let url = url.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let result = match repo.find_remote(&name) {
            Ok(_) => {
                repo.remote_set_url(&name, &url)?;
                Ok(RemoteChange::Updated)
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                repo.remote(&name, &url)?;
                Ok(RemoteChange::Added)
            }
            Err(e) => Err(e.into()),
        };
        result
    })
    .await
    .map_err(|e| AppError::Git(format!("Remote task panicked: {e}")))?
}

fn status_code(status: Status) -> String {
    if status.is_conflicted() {
        return "UU".to_string();
    }
    if status.is_wt_new() && !status.intersects(Status::INDEX_NEW) {
        return "??".to_string();
    }

    let index = if status.is_index_new() {
        'A'
    } else if status.is_index_modified() {
        'M'
    } else if status.is_index_deleted() {
        'D'
    } else if status.is_index_renamed() {
        'R'
    } else if status.is_index_typechange() {
        'T'
    } else {
        ' '
    };

    let worktree = if status.is_wt_modified() {
        'M'
    } else if status.is_wt_deleted() {
        'D'
    } else if status.is_wt_renamed() {
        'R'
    } else if status.is_wt_typechange() {
        'T'
    } else {
        ' '
    };

    format!("{index}{worktree}")
}

/// Short status of the working tree, one `XY path` line per changed file.
/// Ignored files are left out.
pub async fn status_lines(dir: &Path) -> Result<Vec<String>> {
    let dir = dir.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = repo.statuses(Some(&mut opts))?;
        let lines = statuses
            .iter()
            .filter(|entry| entry.status() != Status::CURRENT && !entry.status().is_ignored())
            .map(|entry| {
                format!(
                    "{} {}",
                    status_code(entry.status()),
                    entry.path().unwrap_or("<non-utf8 path>")
                )
            })
            .collect();
        Ok(lines)
    })
    .await
    .map_err(|e| AppError::Git(format!("Status task panicked: {e}")))?
}

/// Check if there are any staged, unstaged or untracked changes.
pub async fn has_changes(dir: &Path) -> Result<bool> {
    Ok(!status_lines(dir).await?.is_empty())
}

/// Stage all changes, deletions included.
pub async fn add_all(dir: &Path) -> Result<()> {
    let dir = dir.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Add-all task panicked: {e}")))?
}

/// Commit the index with a message.
///
/// Returns `NothingToCommit` when the index matches HEAD. On an unborn
/// branch the commit has no parent.
pub async fn commit(dir: &Path, message: &str, author: &Author) -> Result<CommitOutcome> {
    let dir = dir.to_path_buf();
    let message = message.to_string();
    let author = author.clone();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut index = repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = repo.find_tree(tree_oid)?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_oid,
            None => tree.is_empty(),
        };
        if unchanged {
            return Ok(CommitOutcome::NothingToCommit);
        }

        let sig = match repo.signature() {
            Ok(sig) => sig,
            Err(_) => Signature::now(&author.name, &author.email)?,
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &parents)?;
        Ok(CommitOutcome::Committed { id: oid.to_string() })
    })
    .await
    .map_err(|e| AppError::Git(format!("Commit task panicked: {e}")))?
}

/// Push `branch` to `remote` and record it as the upstream (`push -u`).
pub async fn push(dir: &Path, remote: &str, branch: &str, token: &str) -> Result<()> {
    validate_branch_name(branch)?;

    let dir = dir.to_path_buf();
    let remote_name = remote.to_string();
    let branch_name = branch.to_string();
    let token = token.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut remote = repo.find_remote(&remote_name)?;
        let refspec = format!("refs/heads/{branch_name}:refs/heads/{branch_name}");
        let mut push_opts = make_push_options(&token);
        remote.push(&[&refspec], Some(&mut push_opts))?;

        // Tracking ref only exists once the remote's tips were updated
        let upstream = format!("{remote_name}/{branch_name}");
        if let Err(e) = repo
            .find_branch(&branch_name, BranchType::Local)
            .and_then(|mut b| b.set_upstream(Some(upstream.as_str())))
        {
            tracing::debug!(error = %e.message(), upstream = %upstream, "Could not set upstream");
        }
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Push task panicked: {e}")))?
}

/// True when the remote already has the local tip of `branch`.
///
/// Asks the remote for its refs instead of trusting `refs/remotes/*`, which
/// goes stale when the remote repository is replaced. An unreachable remote
/// counts as out of sync so the push reports the real error.
pub async fn is_in_sync(dir: &Path, remote: &str, branch: &str, token: &str) -> Result<bool> {
    let dir = dir.to_path_buf();
    let remote_name = remote.to_string();
    let local_ref = format!("refs/heads/{branch}");
    let token = token.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let Ok(local) = repo.refname_to_id(&local_ref) else {
            return Ok(false);
        };

        let mut remote = repo.find_remote(&remote_name)?;
        let connection =
            match remote.connect_auth(Direction::Fetch, Some(make_callbacks(&token)), None) {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::debug!(error = %e.message(), remote = %remote_name, "Could not list remote refs");
                    return Ok(false);
                }
            };
        let tip = connection
            .list()?
            .iter()
            .find(|head| head.name() == local_ref)
            .map(|head| head.oid());
        Ok(tip == Some(local))
    })
    .await
    .map_err(|e| AppError::Git(format!("Sync-check task panicked: {e}")))?
}

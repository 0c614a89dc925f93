use git2::{
    cert::Cert, AutotagOption, CertificateCheckStatus, Config, Cred, CredentialType,
    FetchOptions, RemoteCallbacks,
};
use log::trace;
use ssh_key::{known_hosts::HostPatterns, KnownHosts};

const GLOBAL_KNOWN_HOSTS: &str = "/etc/ssh/ssh_known_hosts";

/// Authentication and host verification for fetches that go over the network.
pub struct RemoteAccess {
    git_config: Config,
}

impl RemoteAccess {
    pub fn new(git_config: Config) -> Self {
        RemoteAccess { git_config }
    }

    pub fn fetch_options(&self, tags: AutotagOption) -> FetchOptions<'_> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed_types| {
            trace!(
                "Requested credentials for {}, username {:?}, allowed types {:?}",
                url,
                username,
                allowed_types
            );
            // Asking for ssh username
            if allowed_types.contains(CredentialType::USERNAME) {
                return Cred::username("git");
            }
            // SSH auth
            if allowed_types.contains(CredentialType::SSH_KEY) {
                return Cred::ssh_key_from_agent(username.unwrap_or("git"));
            }
            // HTTP auth
            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                return Cred::credential_helper(&self.git_config, url, username);
            }
            Err(git2::Error::from_str("no valid authentication available"))
        });

        callbacks.certificate_check(|certificate, host| check_certificate(certificate, host));
        callbacks.transfer_progress(|progress| {
            trace!(
                "Received {}/{} objects ({} bytes)",
                progress.received_objects(),
                progress.total_objects(),
                progress.received_bytes()
            );
            true
        });

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks).download_tags(tags);
        fetch_options
    }
}

/// Accepts SSH host keys listed in the system known-hosts file and leaves every other
/// decision to libgit2.
fn check_certificate(
    certificate: &Cert<'_>,
    host: &str,
) -> Result<CertificateCheckStatus, git2::Error> {
    let known = certificate
        .as_hostkey()
        .and_then(|hostkey| hostkey.hostkey())
        .is_some_and(|hostkey| is_known_host_key(host, hostkey));
    Ok(if known {
        CertificateCheckStatus::CertificateOk
    } else {
        CertificateCheckStatus::CertificatePassthrough
    })
}

fn is_known_host_key(host: &str, hostkey: &[u8]) -> bool {
    let entries = match KnownHosts::read_file(GLOBAL_KNOWN_HOSTS) {
        Ok(entries) => entries,
        Err(error) => {
            trace!("Could not load {}: {}", GLOBAL_KNOWN_HOSTS, error);
            return false;
        }
    };
    let known = entries.iter().any(|entry| {
        host_matches_patterns(host, entry.host_patterns())
            && entry.public_key().to_bytes().as_deref() == Ok(hostkey)
    });
    trace!("Host key of {} known: {}", host, known);
    known
}

/// Plain host names only; a matching `!` entry excludes the host.
fn host_matches_patterns(host: &str, patterns: &HostPatterns) -> bool {
    let HostPatterns::Patterns(patterns) = patterns else {
        return false;
    };
    let mut listed = false;
    for pattern in patterns.iter().map(|pattern| pattern.to_lowercase()) {
        match pattern.strip_prefix('!') {
            Some(excluded) if excluded == host => return false,
            Some(_) => {}
            None => listed |= pattern == host,
        }
    }
    listed
}

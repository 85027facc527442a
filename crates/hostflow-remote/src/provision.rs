//! Provisioning steps for a freshly booted host

use crate::error::{RemoteError, Result};
use crate::runner::{OsFamily, RemoteCommandRunner};
use crate::shell::{RemoteShell, shell_quote};
use tracing::info;

/// Release package that installs the ZFS on Linux yum repositories
pub const ZFS_REPOSITORY_URL: &str =
    "http://archive.zfsonlinux.org/epel/zfs-release.el7.noarch.rpm";

/// Prefix `git` is built into by [`Provisioner::install_git_from_source`]
const GIT_SOURCE_PREFIX: &str = "/usr/local";
const GIT_SOURCE_URL: &str = "https://www.kernel.org/pub/software/scm/git";

// Keep debug symbols in the DKMS built modules
const ZFS_DEBUG_SETTINGS: &[(&str, &str)] = &[
    ("/etc/sysconfig/spl", "SPL_DKMS_DISABLE_STRIP=y"),
    ("/etc/sysconfig/zfs", "ZFS_DKMS_DISABLE_STRIP=y"),
];

/// High-level provisioning helpers built on [`RemoteCommandRunner`]
pub struct Provisioner<'a> {
    runner: RemoteCommandRunner<'a>,
}

impl<'a> Provisioner<'a> {
    pub fn new(shell: &'a dyn RemoteShell) -> Self {
        Self {
            runner: RemoteCommandRunner::new(shell),
        }
    }

    pub fn runner(&self) -> &RemoteCommandRunner<'a> {
        &self.runner
    }

    /// Install every package that is not installed yet.
    ///
    /// Returns the packages that were actually installed.
    pub async fn install_packages(&self, packages: &[String], repo: Option<&str>) -> Result<Vec<String>> {
        let family = self.runner.supported_os_family().await?;
        let mut installed = Vec::new();

        for package in packages {
            if self.runner.is_package_installed(package).await? {
                info!(package = %package, "Already installed");
                continue;
            }

            let pkg = shell_quote(package);
            let command = match (family, repo) {
                (OsFamily::Rpm, Some(repo)) => format!(
                    "yum install -y --quiet --enablerepo={} {}",
                    shell_quote(repo),
                    pkg
                ),
                (OsFamily::Rpm, None) => format!("yum install -y --quiet {}", pkg),
                (_, Some(repo)) => format!(
                    "DEBIAN_FRONTEND=noninteractive apt-get install -y -q -t {} {}",
                    shell_quote(repo),
                    pkg
                ),
                (_, None) => format!("DEBIAN_FRONTEND=noninteractive apt-get install -y -q {}", pkg),
            };

            info!(package = %package, repo = ?repo, "Installing package");
            self.runner.run_privileged(&command).await?;
            installed.push(package.clone());
        }

        Ok(installed)
    }

    /// Install a package file from a URL unless `name` is already installed.
    ///
    /// Returns whether anything was installed.
    pub async fn install_package_from_url(&self, name: &str, url: &str) -> Result<bool> {
        let family = self.runner.supported_os_family().await?;
        if self.runner.is_package_installed(name).await? {
            info!(package = %name, "Already installed");
            return Ok(false);
        }

        let command = match family {
            OsFamily::Rpm => format!("rpm -i {}", shell_quote(url)),
            _ => {
                let file = format!("/tmp/{}.deb", name);
                format!(
                    "curl -fsSL -o {file} {url} && dpkg -i {file}",
                    file = shell_quote(&file),
                    url = shell_quote(url)
                )
            }
        };

        info!(package = %name, url = %url, "Installing package from URL");
        self.runner.run_privileged(&command).await?;
        Ok(true)
    }

    pub async fn install_os_updates(&self) -> Result<()> {
        match self.runner.supported_os_family().await? {
            OsFamily::Rpm => {
                self.runner.run_privileged("yum -y --quiet update").await?;
            }
            _ => {
                self.runner.run_privileged("apt-get update").await?;
                self.runner
                    .run_privileged("DEBIAN_FRONTEND=noninteractive apt-get -y upgrade")
                    .await?;
            }
        }
        info!("OS updates installed");
        Ok(())
    }

    pub async fn systemd(&self, service: &str, start: bool, enabled: bool, unmask: bool) -> Result<()> {
        self.runner.systemd(service, start, enabled, unmask).await
    }

    /// Install firewalld and make sure it runs
    pub async fn enable_firewalld(&self) -> Result<()> {
        self.install_packages(&["firewalld".to_string()], None)
            .await?;
        self.runner.systemd("firewalld", true, true, true).await
    }

    pub async fn add_firewalld_service(&self, service: &str, permanent: bool) -> Result<()> {
        self.install_packages(&["firewalld".to_string()], None)
            .await?;
        let command = firewall_command("--add-service", service, permanent);
        self.runner.run_privileged(&command).await?;
        info!(service, permanent, "Firewall service added");
        Ok(())
    }

    /// `port` is `<number>/<protocol>`, e.g. `8080/tcp`
    pub async fn add_firewalld_port(&self, port: &str, permanent: bool) -> Result<()> {
        self.install_packages(&["firewalld".to_string()], None)
            .await?;
        let command = firewall_command("--add-port", port, permanent);
        self.runner.run_privileged(&command).await?;
        info!(port, permanent, "Firewall port added");
        Ok(())
    }

    /// Switch SELinux off in its config file.
    ///
    /// Returns `true` when SELinux is still active and a reboot is needed.
    pub async fn disable_selinux(&self) -> Result<bool> {
        let config = "/etc/selinux/config";
        let exists = self
            .runner
            .probe_privileged(&format!("test -f {}", config))
            .await?;
        if !exists.success() {
            info!("No SELinux config present");
            return Ok(false);
        }

        self.runner
            .run_privileged(&format!(
                "sed -i 's/^SELINUX=enforcing/SELINUX=disabled/' {}",
                config
            ))
            .await?;

        let mode = self.runner.probe_privileged("getenforce").await?;
        let reboot_needed = mode.success() && mode.stdout.trim() != "Disabled";
        info!(reboot_needed, "SELinux disabled in config");
        Ok(reboot_needed)
    }

    /// Returns whether the group had to be created
    pub async fn create_docker_group(&self) -> Result<bool> {
        let existing = self.runner.probe_privileged("getent group docker").await?;
        if existing.success() {
            return Ok(false);
        }
        self.runner.run_privileged("groupadd docker").await?;
        info!("docker group created");
        Ok(true)
    }

    pub async fn install_docker(&self) -> Result<()> {
        let package = match self.runner.supported_os_family().await? {
            OsFamily::Rpm => "docker",
            _ => "docker.io",
        };
        self.install_packages(&[package.to_string()], None).await?;
        self.runner.ensure_service_running("docker.service", true).await
    }

    /// Pull an image so later runs start from the local cache
    pub async fn cache_docker_image(&self, image: &str) -> Result<()> {
        self.runner
            .run_privileged(&format!("docker pull {}", shell_quote(image)))
            .await?;
        info!(image, "Docker image cached");
        Ok(())
    }

    /// Clone into `dir` in the login user's home unless it already exists.
    ///
    /// Returns whether a clone happened.
    pub async fn git_clone(&self, url: &str, dir: &str) -> Result<bool> {
        let dir = shell_quote(dir);
        if self.runner.probe(&format!("test -e {}", dir)).await?.success() {
            info!(dir = %dir, "Repository already present");
            return Ok(false);
        }
        self.runner
            .run(&format!("git clone {} {}", shell_quote(url), dir))
            .await?;
        Ok(true)
    }

    /// CPU architecture as reported by `uname -m`
    pub async fn arch(&self) -> Result<String> {
        let output = self.runner.run("uname -m").await?;
        Ok(output.stdout.trim().to_string())
    }

    pub async fn container_exists(&self, name: &str) -> Result<bool> {
        let output = self
            .runner
            .probe_privileged(&format!(
                "docker inspect --type container {}",
                shell_quote(name)
            ))
            .await?;
        Ok(output.success())
    }

    /// Full id of the container called `name`, if there is one
    pub async fn container_id(&self, name: &str) -> Result<Option<String>> {
        if !self.container_exists(name).await? {
            return Ok(None);
        }
        let output = self
            .runner
            .run_privileged(&format!(
                "docker inspect --type container --format '{{{{.Id}}}}' {}",
                shell_quote(name)
            ))
            .await?;
        Ok(first_line(&output.stdout))
    }

    /// Force-remove the container. Returns whether one existed.
    pub async fn remove_container(&self, name: &str) -> Result<bool> {
        let Some(id) = self.container_id(name).await? else {
            info!(container = name, "No such container");
            return Ok(false);
        };
        self.runner
            .run_privileged(&format!("docker rm -f {}", shell_quote(&id)))
            .await?;
        info!(container = name, id = %id, "Container removed");
        Ok(true)
    }

    pub async fn image_exists(&self, image: &str) -> Result<bool> {
        let output = self
            .runner
            .probe_privileged(&format!("docker image inspect {}", shell_quote(image)))
            .await?;
        Ok(output.success())
    }

    /// Local id of `image`, if it has been pulled
    pub async fn image_id(&self, image: &str) -> Result<Option<String>> {
        if !self.image_exists(image).await? {
            return Ok(None);
        }
        let output = self
            .runner
            .run_privileged(&format!(
                "docker image inspect --format '{{{{.Id}}}}' {}",
                shell_quote(image)
            ))
            .await?;
        Ok(first_line(&output.stdout))
    }

    /// Force-remove the image. Returns whether it was present.
    pub async fn remove_image(&self, image: &str) -> Result<bool> {
        let Some(id) = self.image_id(image).await? else {
            info!(image, "No such image");
            return Ok(false);
        };
        self.runner
            .run_privileged(&format!("docker rmi -f {}", shell_quote(&id)))
            .await?;
        info!(image, id = %id, "Image removed");
        Ok(true)
    }

    /// `pip install` for the login user, or system wide with `system`
    pub async fn install_python_modules(&self, modules: &[String], system: bool) -> Result<()> {
        let command = format!("pip --quiet install {}", quote_all(modules));
        self.run_as(system, &command).await?;
        info!(?modules, system, "Python modules installed");
        Ok(())
    }

    pub async fn upgrade_pip(&self, system: bool) -> Result<()> {
        self.run_as(system, "pip install --quiet --upgrade pip")
            .await?;
        info!(system, "pip upgraded");
        Ok(())
    }

    /// `gem install` for the login user, or system wide with `system`
    pub async fn install_gems(&self, gems: &[String], system: bool) -> Result<()> {
        let command = format!("gem install {} --no-document", quote_all(gems));
        self.run_as(system, &command).await?;
        info!(?gems, system, "Gems installed");
        Ok(())
    }

    /// Enable EPEL. Returns whether the release package was installed.
    pub async fn add_epel_repository(&self) -> Result<bool> {
        self.require_rpm("EPEL").await?;
        let installed = self
            .install_packages(&["epel-release".to_string()], None)
            .await?;
        Ok(!installed.is_empty())
    }

    /// Add the ZFS on Linux yum repositories
    pub async fn add_zfs_repository(&self) -> Result<bool> {
        self.require_rpm("ZFS on Linux").await?;
        self.install_package_from_url("zfs-release", ZFS_REPOSITORY_URL)
            .await
    }

    /// Install `zfs` from the `zfs-testing` repository with debug symbols kept
    pub async fn install_zfs_from_testing(&self) -> Result<bool> {
        self.require_rpm("ZFS on Linux").await?;

        for (file, line) in ZFS_DEBUG_SETTINGS {
            let command = format!(
                "grep -qx {line} {file} 2>/dev/null || echo {line} >> {file}",
                line = shell_quote(line),
                file = shell_quote(file)
            );
            self.runner.run_privileged(&command).await?;
        }

        let installed = self
            .install_packages(&["zfs".to_string()], Some("zfs-testing"))
            .await?;
        Ok(!installed.is_empty())
    }

    /// Build `git` from the kernel.org tarball into `/usr/local`.
    ///
    /// Returns `false` when a source build is already installed.
    pub async fn install_git_from_source(&self, version: &str) -> Result<bool> {
        let git = format!("{}/bin/git", GIT_SOURCE_PREFIX);
        if self
            .runner
            .probe_privileged(&format!("test -x {}", git))
            .await?
            .success()
        {
            info!(path = %git, "git already built from source");
            return Ok(false);
        }

        let name = format!("git-{}", version);
        let tarball = format!("{}/{}.tar.gz", GIT_SOURCE_URL, name);
        let workdir = format!("{}/src", GIT_SOURCE_PREFIX);

        info!(version, "Building git from source");
        self.runner
            .run_privileged(&format!(
                "cd {dir} && curl -fsSL {url} | tar -zx",
                dir = shell_quote(&workdir),
                url = shell_quote(&tarball)
            ))
            .await?;
        self.runner
            .run_privileged(&format!(
                "cd {dir}/{name} && ./configure --prefix={prefix} && make && make install",
                dir = shell_quote(&workdir),
                name = shell_quote(&name),
                prefix = GIT_SOURCE_PREFIX
            ))
            .await?;
        Ok(true)
    }

    /// Reboot the host. The SSH session drops, so the exit code is ignored.
    pub async fn reboot(&self) -> Result<()> {
        let output = self.runner.probe_privileged("shutdown -r now").await?;
        tracing::debug!(exit_code = output.exit_code, "Reboot issued");
        Ok(())
    }
}

impl Provisioner<'_> {
    async fn run_as(&self, system: bool, command: &str) -> Result<()> {
        if system {
            self.runner.run_privileged(command).await?;
        } else {
            self.runner.run(command).await?;
        }
        Ok(())
    }

    async fn require_rpm(&self, what: &str) -> Result<()> {
        match self.runner.supported_os_family().await? {
            OsFamily::Rpm => Ok(()),
            family => Err(RemoteError::UnsupportedOs(format!(
                "{} needs an rpm based host, found {}",
                what, family
            ))),
        }
    }
}

fn quote_all(values: &[String]) -> String {
    values
        .iter()
        .map(|v| shell_quote(v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.to_string())
}

fn firewall_command(flag: &str, value: &str, permanent: bool) -> String {
    let mut command = format!("firewall-cmd {}={}", flag, shell_quote(value));
    if permanent {
        command.push_str(" --permanent");
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::FakeShell;

    fn packages(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_install_packages_skips_installed() {
        let shell = FakeShell::rpm()
            .respond("rpm -q git", 0, "")
            .respond("rpm -q tmux", 1, "");
        let provisioner = Provisioner::new(&shell);

        let installed = provisioner
            .install_packages(&packages(&["git", "tmux"]), None)
            .await
            .unwrap();

        assert_eq!(installed, vec!["tmux"]);
        let commands = shell.commands();
        assert!(commands.contains(&"yum install -y --quiet tmux".to_string()));
        assert!(!commands.iter().any(|c| c.contains("install -y --quiet git")));
    }

    #[tokio::test]
    async fn test_install_packages_from_repo_on_debian() {
        let shell = FakeShell::debian().respond("dpkg -s", 1, "");
        let provisioner = Provisioner::new(&shell);

        provisioner
            .install_packages(&packages(&["zfsutils-linux"]), Some("backports"))
            .await
            .unwrap();

        assert!(shell.commands().contains(
            &"DEBIAN_FRONTEND=noninteractive apt-get install -y -q -t backports zfsutils-linux"
                .to_string()
        ));
    }

    #[tokio::test]
    async fn test_install_package_from_url() {
        let shell = FakeShell::rpm().respond("rpm -q zfs-release", 1, "");
        let provisioner = Provisioner::new(&shell);

        let installed = provisioner
            .install_package_from_url(
                "zfs-release",
                "http://archive.zfsonlinux.org/epel/zfs-release.el7.noarch.rpm",
            )
            .await
            .unwrap();

        assert!(installed);
        assert!(shell.commands().contains(
            &"rpm -i http://archive.zfsonlinux.org/epel/zfs-release.el7.noarch.rpm".to_string()
        ));
    }

    #[tokio::test]
    async fn test_os_updates_on_debian() {
        let shell = FakeShell::debian();
        Provisioner::new(&shell).install_os_updates().await.unwrap();

        let commands = shell.commands();
        assert!(commands.contains(&"apt-get update".to_string()));
        assert!(
            commands.contains(&"DEBIAN_FRONTEND=noninteractive apt-get -y upgrade".to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_os_rejects_updates() {
        let shell = FakeShell::new().respond("cat /etc/os-release", 0, "ID=arch\n");
        let result = Provisioner::new(&shell).install_os_updates().await;
        assert!(matches!(result, Err(RemoteError::UnsupportedOs(_))));
    }

    #[tokio::test]
    async fn test_firewall_port_permanent() {
        let shell = FakeShell::rpm().respond("rpm -q firewalld", 0, "");
        Provisioner::new(&shell)
            .add_firewalld_port("8080/tcp", true)
            .await
            .unwrap();

        assert!(
            shell
                .commands()
                .contains(&"firewall-cmd --add-port=8080/tcp --permanent".to_string())
        );
    }

    #[tokio::test]
    async fn test_disable_selinux_needs_reboot_when_enforcing() {
        let shell = FakeShell::rpm()
            .respond("test -f /etc/selinux/config", 0, "")
            .respond("getenforce", 0, "Enforcing\n");

        let reboot = Provisioner::new(&shell).disable_selinux().await.unwrap();

        assert!(reboot);
        assert!(shell.commands().iter().any(|c| c.starts_with("sed -i")));
    }

    #[tokio::test]
    async fn test_disable_selinux_already_disabled() {
        let shell = FakeShell::rpm()
            .respond("test -f /etc/selinux/config", 0, "")
            .respond("getenforce", 0, "Disabled\n");

        assert!(!Provisioner::new(&shell).disable_selinux().await.unwrap());
    }

    #[tokio::test]
    async fn test_create_docker_group_only_once() {
        let shell = FakeShell::new().respond("getent group docker", 0, "docker:x:990:");
        let created = Provisioner::new(&shell).create_docker_group().await.unwrap();

        assert!(!created);
        assert!(!shell.commands().contains(&"groupadd docker".to_string()));
    }

    #[tokio::test]
    async fn test_install_docker_enables_service() {
        let shell = FakeShell::rpm().respond("rpm -q docker", 1, "");
        Provisioner::new(&shell).install_docker().await.unwrap();

        let commands = shell.commands();
        assert!(commands.contains(&"yum install -y --quiet docker".to_string()));
        assert!(commands.contains(&"systemctl start docker.service".to_string()));
        assert!(commands.contains(&"systemctl enable docker.service".to_string()));
    }

    #[tokio::test]
    async fn test_git_clone_skips_existing_dir() {
        let shell = FakeShell::new().respond("test -e", 0, "");
        let cloned = Provisioner::new(&shell)
            .git_clone("https://github.com/example/app.git", "app")
            .await
            .unwrap();

        assert!(!cloned);
        assert!(!shell.commands().iter().any(|c| c.starts_with("git clone")));
    }

    #[tokio::test]
    async fn test_git_clone_runs_clone() {
        let shell = FakeShell::new().respond("test -e", 1, "");
        let cloned = Provisioner::new(&shell)
            .git_clone("https://github.com/example/app.git", "app")
            .await
            .unwrap();

        assert!(cloned);
        assert!(
            shell
                .commands()
                .contains(&"git clone https://github.com/example/app.git app".to_string())
        );
    }

    #[tokio::test]
    async fn test_arch_trims_output() {
        let shell = FakeShell::new().respond("uname -m", 0, "x86_64\n");
        assert_eq!(Provisioner::new(&shell).arch().await.unwrap(), "x86_64");
    }

    #[tokio::test]
    async fn test_remove_container_by_id() {
        let shell = FakeShell::new()
            .respond("docker inspect --type container --format", 0, "4f2a9c\n")
            .respond("docker inspect --type container web", 0, "[]");
        let provisioner = Provisioner::new(&shell);

        assert_eq!(
            provisioner.container_id("web").await.unwrap().as_deref(),
            Some("4f2a9c")
        );
        assert!(provisioner.remove_container("web").await.unwrap());
        assert!(shell.commands().contains(&"docker rm -f 4f2a9c".to_string()));
    }

    #[tokio::test]
    async fn test_remove_missing_container() {
        let shell = FakeShell::new().respond("docker inspect", 1, "");
        let provisioner = Provisioner::new(&shell);

        assert!(!provisioner.container_exists("web").await.unwrap());
        assert!(!provisioner.remove_container("web").await.unwrap());
        assert!(!shell.commands().iter().any(|c| c.starts_with("docker rm")));
    }

    #[tokio::test]
    async fn test_remove_image_by_id() {
        let shell = FakeShell::new()
            .respond("docker image inspect --format", 0, "sha256:ab12\n")
            .respond("docker image inspect", 0, "[]");
        let provisioner = Provisioner::new(&shell);

        assert!(provisioner.image_exists("centos:7").await.unwrap());
        assert!(provisioner.remove_image("centos:7").await.unwrap());
        assert!(
            shell
                .commands()
                .contains(&"docker rmi -f sha256:ab12".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_image_has_no_id() {
        let shell = FakeShell::new().respond("docker image inspect", 1, "Error: No such image");
        let provisioner = Provisioner::new(&shell);

        assert_eq!(provisioner.image_id("centos:7").await.unwrap(), None);
        assert!(!provisioner.remove_image("centos:7").await.unwrap());
    }

    #[tokio::test]
    async fn test_python_modules_for_user_and_system() {
        let shell = FakeShell::new();
        let provisioner = Provisioner::new(&shell);

        provisioner
            .install_python_modules(&packages(&["tox", "docker-compose"]), false)
            .await
            .unwrap();
        provisioner.upgrade_pip(true).await.unwrap();

        assert_eq!(
            shell.commands(),
            vec![
                "pip --quiet install tox docker-compose",
                "pip install --quiet --upgrade pip"
            ]
        );
    }

    #[tokio::test]
    async fn test_install_gems() {
        let shell = FakeShell::new();
        Provisioner::new(&shell)
            .install_gems(&packages(&["bundler"]), true)
            .await
            .unwrap();

        assert_eq!(shell.commands(), vec!["gem install bundler --no-document"]);
    }

    #[tokio::test]
    async fn test_gem_failure_is_reported() {
        let shell = FakeShell::new().respond("gem install", 2, "ERROR: Could not find a valid gem");
        let result = Provisioner::new(&shell)
            .install_gems(&packages(&["nope"]), false)
            .await;

        assert!(matches!(result, Err(RemoteError::RemoteCommand { exit_code: 2, .. })));
    }

    #[tokio::test]
    async fn test_add_epel_repository() {
        let shell = FakeShell::rpm().respond("rpm -q epel-release", 1, "");
        let added = Provisioner::new(&shell).add_epel_repository().await.unwrap();

        assert!(added);
        assert!(
            shell
                .commands()
                .contains(&"yum install -y --quiet epel-release".to_string())
        );
    }

    #[tokio::test]
    async fn test_epel_requires_rpm_host() {
        let shell = FakeShell::debian();
        let result = Provisioner::new(&shell).add_epel_repository().await;

        assert!(matches!(result, Err(RemoteError::UnsupportedOs(_))));
        assert!(!shell.commands().iter().any(|c| c.contains("epel-release")));
    }

    #[tokio::test]
    async fn test_add_zfs_repository() {
        let shell = FakeShell::rpm().respond("rpm -q zfs-release", 1, "");
        assert!(Provisioner::new(&shell).add_zfs_repository().await.unwrap());

        assert!(
            shell
                .commands()
                .contains(&format!("rpm -i {}", ZFS_REPOSITORY_URL))
        );
    }

    #[tokio::test]
    async fn test_zfs_from_testing_keeps_debug_symbols() {
        let shell = FakeShell::rpm().respond("rpm -q zfs", 1, "");
        let installed = Provisioner::new(&shell)
            .install_zfs_from_testing()
            .await
            .unwrap();

        assert!(installed);
        let commands = shell.commands();
        assert!(commands.contains(
            &"grep -qx SPL_DKMS_DISABLE_STRIP=y /etc/sysconfig/spl 2>/dev/null || echo SPL_DKMS_DISABLE_STRIP=y >> /etc/sysconfig/spl"
                .to_string()
        ));
        assert!(
            commands
                .iter()
                .any(|c| c.ends_with(">> /etc/sysconfig/zfs"))
        );
        assert!(commands.contains(
            &"yum install -y --quiet --enablerepo=zfs-testing zfs".to_string()
        ));
    }

    #[tokio::test]
    async fn test_git_from_source_skips_existing_build() {
        let shell = FakeShell::new().respond("test -x /usr/local/bin/git", 0, "");
        let built = Provisioner::new(&shell)
            .install_git_from_source("2.4.6")
            .await
            .unwrap();

        assert!(!built);
        assert_eq!(shell.commands(), vec!["test -x /usr/local/bin/git"]);
    }

    #[tokio::test]
    async fn test_git_from_source_builds() {
        let shell = FakeShell::new().respond("test -x /usr/local/bin/git", 1, "");
        let built = Provisioner::new(&shell)
            .install_git_from_source("2.4.6")
            .await
            .unwrap();

        assert!(built);
        assert_eq!(
            shell.commands()[1..],
            [
                "cd /usr/local/src && curl -fsSL https://www.kernel.org/pub/software/scm/git/git-2.4.6.tar.gz | tar -zx",
                "cd /usr/local/src/git-2.4.6 && ./configure --prefix=/usr/local && make && make install",
            ]
        );
    }
}

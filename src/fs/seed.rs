//! Starting world for a new session

use super::{VirtualFilesystem, ROOT_USER};
use crate::Result;

const MOTD: &str = "Welcome to Terminal Quest.\nType 'help' for commands or 'mission list' to find work.";

const README: &str = "\
Your first day on the job.

Use 'ls' to look around, 'cd' to move and 'cat' to read files.
Missions are listed with 'mission list'. Good luck.";

const AUTH_LOG: &str = "\
Jan  6 09:12:01 quest sshd[812]: Accepted password for user from 10.0.0.5 port 51122
Jan  6 09:40:17 quest sshd[901]: Failed password for root from 203.0.113.42 port 40211
Jan  6 09:40:19 quest sshd[901]: Failed password for root from 203.0.113.42 port 40213
Jan  6 09:40:22 quest sshd[901]: Failed password for admin from 203.0.113.42 port 40219
Jan  6 09:41:02 quest sudo:     user : TTY=pts/0 ; PWD=/home/user ; USER=root ; COMMAND=/bin/ls";

const SYSLOG: &str = "\
Jan  6 09:00:00 quest kernel: Booting virtual machine
Jan  6 09:00:02 quest systemd[1]: Started OpenSSH server
Jan  6 09:00:03 quest cron[420]: (root) CMD (backup.sh)";

const SCANNER: &str = "#!/bin/sh\n# network scanner\necho scanning...";

/// Populate a fresh filesystem with the default world.
pub fn populate(fs: &mut VirtualFilesystem, user: &str, hostname: &str) -> Result<()> {
    let home = fs.home().to_string();
    let previous = fs.acting_user().to_string();

    fs.set_acting_user(ROOT_USER);
    for dir in ["/etc", "/var/log", "/tmp", "/usr/bin", "/bin", "/root"] {
        fs.create_directory(dir, true)?;
    }
    fs.change_permissions("/root", "700")?;
    fs.change_permissions("/tmp", "777")?;
    fs.create_file("/etc/hostname", hostname)?;
    fs.create_file(
        "/etc/passwd",
        &format!(
            "root:x:0:0:root:/root:/bin/qsh\n{user}:x:1000:1000:{user}:{home}:/bin/qsh"
        ),
    )?;
    fs.create_file("/etc/motd", MOTD)?;
    fs.create_file("/var/log/auth.log", AUTH_LOG)?;
    fs.create_file("/var/log/syslog", SYSLOG)?;
    fs.create_file("/usr/bin/scanner.sh", SCANNER)?;
    fs.change_permissions("/usr/bin/scanner.sh", "755")?;
    fs.create_file("/root/flag.txt", "FLAG{elevated_access}")?;

    fs.set_acting_user(user);
    for dir in ["Documents", "Downloads"] {
        fs.create_directory(&format!("{}/{}", home, dir), true)?;
    }
    fs.create_file(&format!("{}/.bashrc", home), "alias ll='ls -l'\nexport EDITOR=nano")?;
    fs.create_file(&format!("{}/readme.txt", home), README)?;
    fs.create_file(
        &format!("{}/Documents/todo.txt", home),
        "- read the readme\n- check the auth log\n- report suspicious logins",
    )?;

    fs.set_acting_user(&previous);
    Ok(())
}

//! Device tree source backed by the config file, re-read on every refresh so
//! machines can be added or retired without restarting the daemon.

use dwp_config::Device;
use dwp_core::DeviceConfigSource;
use std::fs;
use std::path::PathBuf;

pub struct FileDevices {
    path: PathBuf,
}

impl FileDevices {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DeviceConfigSource for FileDevices {
    fn devices(&mut self) -> Result<Vec<Device>, Box<dyn std::error::Error + Send + Sync>> {
        let text = fs::read_to_string(&self.path)?;
        let cfg = dwp_config::load_toml(&text)?;
        Ok(cfg.devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rereads_the_file_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dwp.toml");
        std::fs::write(
            &path,
            r#"
[[devices]]
name = "plc1"
address = "10.0.0.1:502"
"#,
        )
        .unwrap();

        let mut source = FileDevices::new(&path);
        assert_eq!(source.devices().unwrap().len(), 1);

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(
            file,
            "\n[[devices]]\nname = \"plc2\"\naddress = \"10.0.0.2:502\"\n"
        )
        .unwrap();
        assert_eq!(source.devices().unwrap().len(), 2);
    }
}

use std::path::{Path, PathBuf};

/// File the stand-in ffmpeg copies its `-i` input to.
pub const RECORDED_INPUT: &str = "ffmpeg-input.bin";

/// Behaviour of the stand-in ffmpeg executable.
#[derive(Debug, Clone, Copy)]
pub enum FakeFfmpeg {
    /// Exit 0 after writing `n` frames next to the output pattern.
    Frames(u32),
    /// Exit 1 with a decoder error on stderr.
    Fail,
    /// Exit 0 without writing anything.
    NoOutput,
}

impl FakeFfmpeg {
    /// Write the script into `dir`; returns its path and the file it records its
    /// arguments to (one per line). The script also copies its input video to
    /// [`RECORDED_INPUT`] inside `dir`.
    pub fn install(self, dir: &Path) -> (PathBuf, PathBuf) {
        let script_path = dir.join("fake-ffmpeg");
        let args_path = dir.join("ffmpeg-args.txt");

        let body = match self {
            FakeFfmpeg::Frames(n) => format!(
                r#"for last in "$@"; do :; done
out_dir=$(dirname "$last")
i=1
while [ "$i" -le {n} ]; do
  printf 'frame %d' "$i" > "$out_dir/$(printf 'frame_%04d.png' "$i")"
  i=$((i + 1))
done
exit 0"#
            ),
            FakeFfmpeg::Fail => {
                "echo 'sample.mp4: Invalid data found when processing input' >&2\nexit 1"
                    .to_string()
            }
            FakeFfmpeg::NoOutput => "exit 0".to_string(),
        };

        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\ncat \"$2\" > '{}' 2>/dev/null\n{}\n",
            args_path.display(),
            dir.join(RECORDED_INPUT).display(),
            body
        );
        std::fs::write(&script_path, script).expect("write fake ffmpeg");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod fake ffmpeg");
        }

        (script_path, args_path)
    }
}

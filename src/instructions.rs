//! Retrieval instructions printed once the tunnel is up

use std::io;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use url::Url;

use crate::launcher::TunnelSession;
use crate::workspace::ServedFile;

/// Public download URL for a served file.
pub fn file_url(public_url: &Url, file: &ServedFile) -> String {
    public_url
        .join(&file.relative)
        .map(String::from)
        .unwrap_or_else(|_| {
            format!(
                "{}/{}",
                public_url.as_str().trim_end_matches('/'),
                file.relative
            )
        })
}

pub fn print_instructions(session: &TunnelSession, files: &[ServedFile]) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    write_instructions(
        &mut stdout,
        session.public_url(),
        session.port(),
        session.local_url(),
        files,
    )
}

pub fn write_instructions<W: WriteColor>(
    out: &mut W,
    public_url: &Url,
    port: u16,
    local_url: &str,
    files: &[ServedFile],
) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    writeln!(out, "\n✅ Node directory is reachable at {public_url}")?;
    out.reset()?;
    writeln!(out, "   Local server: {local_url} (port {port})")?;

    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    writeln!(out, "\n📥 Fetch the credential files from the other machine:")?;
    out.reset()?;

    for file in files {
        writeln!(
            out,
            "   curl -fsSL {} -o {}",
            file_url(public_url, file),
            file.file_name()
        )?;
        if !file.present {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            writeln!(out, "   ⚠ {} does not exist yet", file.absolute.display())?;
            out.reset()?;
        }
    }

    writeln!(out, "\nPress Ctrl-C to stop the server and the tunnel.")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use termcolor::NoColor;

    fn served(rel: &str, present: bool) -> ServedFile {
        ServedFile {
            relative: rel.into(),
            absolute: PathBuf::from("/node").join(rel),
            present,
        }
    }

    #[test]
    fn file_urls_hang_off_the_public_root() {
        let url = Url::parse("https://brave-otter.trycloudflare.com").unwrap();
        assert_eq!(
            file_url(&url, &served("config/node_key.json", true)),
            "https://brave-otter.trycloudflare.com/config/node_key.json"
        );
    }

    #[test]
    fn instructions_list_every_file_and_flag_missing_ones() {
        let url = Url::parse("https://brave-otter.trycloudflare.com").unwrap();
        let files = [
            served("config/peer.key", false),
            served("config/node_key.json", true),
            served("config/priv_validator_key.json", true),
        ];

        let mut out = NoColor::new(Vec::new());
        write_instructions(&mut out, &url, 8001, "http://localhost:8001", &files).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();

        assert!(text.contains("https://brave-otter.trycloudflare.com/"));
        assert!(text.contains("port 8001"));
        assert!(text.contains(
            "curl -fsSL https://brave-otter.trycloudflare.com/config/priv_validator_key.json -o priv_validator_key.json"
        ));
        assert_eq!(text.matches("curl -fsSL").count(), 3);
        assert_eq!(text.matches("does not exist yet").count(), 1);
        assert!(text.contains("/node/config/peer.key does not exist yet"));
    }
}

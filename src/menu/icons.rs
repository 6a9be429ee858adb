//! Lazy icon population for action entries.
//!
//! Every decode is scheduled before any is awaited, so one slow icon never
//! delays the others from starting, and the awaited timeout bounds how long a
//! single entry can hold up menu completion. Order of the tree is fixed before
//! any decode finishes.

use crate::menu::CancellationFlag;
use crate::models::{MenuEntry, MenuEntryKind, MenuIcon};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub type IconDecoder = Arc<dyn Fn(&[u8]) -> Option<MenuIcon> + Send + Sync>;

/// Decodes raw icon bytes into a display-ready PNG. Any failure is swallowed:
/// a menu without one icon is still a menu.
pub fn decode_icon(bytes: &[u8]) -> Option<MenuIcon> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            log::debug!("Icon decode failed: {}", e);
            return None;
        }
    };
    let (width, height) = img.dimensions();

    let mut png = Vec::new();
    if let Err(e) = img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png) {
        log::debug!("Icon encode failed: {}", e);
        return None;
    }

    Some(MenuIcon { width, height, data: png })
}

/// Populates `icon` for every action entry carrying raw icon bytes, waiting at
/// most `timeout` per entry. On timeout, error or cancellation the icon stays
/// `None` for the rest of the session; there is no retry.
pub async fn materialize_icons(entries: &mut Vec<MenuEntry>, timeout: Duration, cancel: &CancellationFlag) {
    materialize_icons_with(entries, timeout, cancel, Arc::new(decode_icon)).await;
}

/// Same as [`materialize_icons`] but with an injectable decoder.
pub async fn materialize_icons_with(
    entries: &mut Vec<MenuEntry>,
    timeout: Duration,
    cancel: &CancellationFlag,
    decoder: IconDecoder,
) {
    let mut jobs: Vec<(Vec<usize>, JoinHandle<Option<MenuIcon>>)> = Vec::new();
    spawn_decodes(entries, &mut Vec::new(), &mut jobs, &decoder);

    for (path, mut handle) in jobs {
        if cancel.is_cancelled() {
            handle.abort();
            continue;
        }
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(Some(icon))) => {
                if let Some(entry) = entry_at_mut(entries, &path) {
                    entry.icon = Some(icon);
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => log::debug!("Icon decode task failed: {}", e),
            Err(_) => {
                log::debug!("Icon decode timed out after {:?}", timeout);
                handle.abort();
            }
        }
    }
}

fn spawn_decodes(
    entries: &[MenuEntry],
    prefix: &mut Vec<usize>,
    jobs: &mut Vec<(Vec<usize>, JoinHandle<Option<MenuIcon>>)>,
    decoder: &IconDecoder,
) {
    for (i, entry) in entries.iter().enumerate() {
        prefix.push(i);
        if entry.kind == MenuEntryKind::Action {
            if let Some(tag) = &entry.tag {
                if !tag.icon.is_empty() {
                    let bytes = tag.icon.clone();
                    let decode = Arc::clone(decoder);
                    jobs.push((
                        prefix.clone(),
                        tokio::task::spawn_blocking(move || decode(&bytes)),
                    ));
                }
            }
        }
        spawn_decodes(&entry.children, prefix, jobs, decoder);
        prefix.pop();
    }
}

fn entry_at_mut<'a>(entries: &'a mut [MenuEntry], path: &[usize]) -> Option<&'a mut MenuEntry> {
    let (&first, rest) = path.split_first()?;
    let entry = entries.get_mut(first)?;
    if rest.is_empty() {
        Some(entry)
    } else {
        entry_at_mut(&mut entry.children, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawMenuEntry;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
        buf
    }

    fn entry_with_icon(id: i32, label: &str, icon: Vec<u8>) -> MenuEntry {
        let mut raw = RawMenuEntry::action(id, label, None);
        raw.icon = icon;
        MenuEntry::action(id, label.to_string(), None, Some(Arc::new(raw)))
    }

    #[test]
    fn test_decode_icon_accepts_png_and_rejects_garbage() {
        let icon = decode_icon(&png_bytes()).unwrap();
        assert_eq!((icon.width, icon.height), (4, 4));

        assert!(decode_icon(&[0xde, 0xad, 0xbe, 0xef]).is_none());
    }

    #[tokio::test]
    async fn test_icons_are_populated_in_place() {
        let mut entries = vec![
            entry_with_icon(1, "A", png_bytes()),
            MenuEntry::action(2, "B".into(), None, None),
        ];

        materialize_icons(&mut entries, Duration::from_secs(1), &CancellationFlag::new()).await;

        assert!(entries[0].icon.is_some());
        assert!(entries[1].icon.is_none());
    }

    #[tokio::test]
    async fn test_submenu_children_are_materialized() {
        let child = entry_with_icon(3, "Child", png_bytes());
        let mut entries = vec![MenuEntry::submenu(1, "Sub".into(), vec![child], None)];

        materialize_icons(&mut entries, Duration::from_secs(1), &CancellationFlag::new()).await;

        assert!(entries[0].children[0].icon.is_some());
    }

    #[tokio::test]
    async fn test_slow_decode_times_out_without_reordering_siblings() {
        let mut entries = vec![
            entry_with_icon(1, "A", png_bytes()),
            entry_with_icon(2, "B", vec![0x42]), // decoder stalls on this one
            entry_with_icon(3, "C", png_bytes()),
        ];

        let slow: IconDecoder = Arc::new(|bytes| {
            if bytes == [0x42].as_slice() {
                std::thread::sleep(Duration::from_millis(200));
                None
            } else {
                decode_icon(bytes)
            }
        });

        materialize_icons_with(
            &mut entries,
            Duration::from_millis(20),
            &CancellationFlag::new(),
            slow,
        )
        .await;

        let labels: Vec<_> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
        assert!(entries[0].icon.is_some());
        assert!(entries[1].icon.is_none());
        assert!(entries[2].icon.is_some());
    }

    #[tokio::test]
    async fn test_cancellation_skips_remaining_decodes() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let mut entries = vec![entry_with_icon(1, "A", png_bytes())];

        materialize_icons(&mut entries, Duration::from_secs(1), &cancel).await;

        assert!(entries[0].icon.is_none());
    }
}

//! Real Windows implementations of the capability traits: COM context-menu
//! scraping and invocation, PowerShell-backed font installation and disk
//! image mounting, and the native format dialog.

use crate::models::{MenuError, RawEntryKind, RawMenuEntry, Result, VerbFilter};
use crate::shell::{DiskServices, EnumerateFlags, FontInstaller, ShellMenuSource};
use crate::utils::path_security::validate_path;
use std::io::Cursor;
use std::os::windows::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use windows::core::{Interface, PCSTR, PCWSTR, PSTR};
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::Graphics::Gdi::{
    GetDC, GetDIBits, GetObjectW, ReleaseDC, BITMAP, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
    DIB_RGB_COLORS, HBITMAP, HGDIOBJ,
};
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};
use windows::Win32::UI::Shell::Common::ITEMIDLIST;
use windows::Win32::UI::Shell::{
    IContextMenu, IContextMenu2, IContextMenu3, IShellFolder, SHBindToParent, SHFormatDrive,
    SHParseDisplayName, CMINVOKECOMMANDINFO, CMF_EXTENDEDVERBS, CMF_NORMAL, CMF_SYNCCASCADEMENU,
    GCS_VERBA, SHFMT_ID_DEFAULT, SHFMT_OPT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreatePopupMenu, DestroyMenu, GetMenuItemCount, GetMenuItemID, GetMenuItemInfoW,
    GetMenuStringW, GetSubMenu, HMENU, MENUITEMINFOW, MFT_SEPARATOR, MF_BYPOSITION, MIIM_BITMAP,
    MIIM_FTYPE, SW_SHOWNORMAL, WM_INITMENUPOPUP,
};

const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Shell ids handed to QueryContextMenu; anything outside this range is a
/// popup or system artifact.
const ID_FIRST: u32 = 1;
const ID_LAST: u32 = 0x7FFF;

pub struct WindowsShell;

impl ShellMenuSource for WindowsShell {
    fn enumerate(
        &self,
        target_paths: &[PathBuf],
        flags: EnumerateFlags,
        filter: &VerbFilter,
    ) -> Result<Vec<RawMenuEntry>> {
        unsafe {
            let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
            let result = with_context_menu(target_paths, |context_menu| {
                let hmenu = CreatePopupMenu().map_err(|e| MenuError::Enumeration(e.to_string()))?;
                let mut cmf = CMF_NORMAL | CMF_SYNCCASCADEMENU;
                if flags.extended_verbs {
                    cmf |= CMF_EXTENDEDVERBS;
                }
                let _ = context_menu.QueryContextMenu(hmenu, 0, ID_FIRST, ID_LAST, cmf);

                let cm2: Option<IContextMenu2> = context_menu.cast().ok();
                let cm3: Option<IContextMenu3> = context_menu.cast().ok();
                let entries = scrape_level(hmenu, context_menu, cm2.as_ref(), cm3.as_ref(), filter);

                let _ = DestroyMenu(hmenu);
                Ok(entries)
            });
            CoUninitialize();
            result
        }
    }

    fn invoke(&self, id: i32, target_paths: &[PathBuf]) -> Result<()> {
        if !(ID_FIRST as i32..=ID_LAST as i32).contains(&id) {
            return Err(MenuError::Invocation(format!("Id out of range: {}", id)));
        }
        unsafe {
            let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
            let result = with_context_menu(target_paths, |context_menu| {
                // The extension only learns its ids from QueryContextMenu, so
                // the menu must be re-queried and cascades re-initialized
                // before InvokeCommand.
                let hmenu = CreatePopupMenu().map_err(|e| MenuError::Invocation(e.to_string()))?;
                let _ = context_menu.QueryContextMenu(hmenu, 0, ID_FIRST, ID_LAST, CMF_NORMAL | CMF_SYNCCASCADEMENU);

                let cm2: Option<IContextMenu2> = context_menu.cast().ok();
                let cm3: Option<IContextMenu3> = context_menu.cast().ok();
                init_all_submenus(hmenu, cm2.as_ref(), cm3.as_ref());

                let info = CMINVOKECOMMANDINFO {
                    cbSize: std::mem::size_of::<CMINVOKECOMMANDINFO>() as u32,
                    hwnd: HWND::default(),
                    lpVerb: PCSTR((id - 1) as *mut u8),
                    nShow: SW_SHOWNORMAL.0,
                    ..Default::default()
                };
                let invoked = context_menu
                    .InvokeCommand(&info)
                    .map_err(|e| MenuError::Invocation(format!("InvokeCommand failed: {}", e)));

                let _ = DestroyMenu(hmenu);
                invoked
            });
            CoUninitialize();
            result
        }
    }
}

/// Binds the parent folder of the selection and hands an `IContextMenu` over
/// all selected items to `f`. Item pidls are freed before returning.
unsafe fn with_context_menu<T>(
    target_paths: &[PathBuf],
    f: impl FnOnce(&IContextMenu) -> Result<T>,
) -> Result<T> {
    if target_paths.is_empty() {
        return Err(MenuError::PathError("No target paths for shell menu".to_string()));
    }

    let mut pidls_full: Vec<*mut ITEMIDLIST> = Vec::with_capacity(target_paths.len());
    let mut pidls_relative: Vec<*const ITEMIDLIST> = Vec::with_capacity(target_paths.len());
    let mut parent_folder: Option<IShellFolder> = None;

    unsafe fn free_all(pidls: &[*mut ITEMIDLIST]) {
        for &pidl in pidls {
            windows::Win32::UI::Shell::ILFree(Some(pidl as *const _));
        }
    }

    for path in target_paths {
        let pb = validate_path(&path.to_string_lossy())?;
        let path_norm = pb.to_string_lossy().replace('/', "\\");
        let path_u16: Vec<u16> = path_norm.encode_utf16().chain(std::iter::once(0)).collect();

        let mut pidl_full = std::ptr::null_mut();
        if let Err(e) = SHParseDisplayName(PCWSTR(path_u16.as_ptr()), None, &mut pidl_full, 0, None) {
            free_all(&pidls_full);
            return Err(MenuError::Enumeration(format!("SHParseDisplayName failed: {}", e)));
        }
        pidls_full.push(pidl_full);

        let mut pidl_relative = std::ptr::null();
        match SHBindToParent(pidl_full, Some(&mut pidl_relative)) {
            Ok(folder) => {
                // All items are expected to share the parent of the first one.
                parent_folder.get_or_insert(folder);
                pidls_relative.push(pidl_relative);
            }
            Err(e) => {
                free_all(&pidls_full);
                return Err(MenuError::Enumeration(format!("SHBindToParent failed: {:?}", e)));
            }
        }
    }

    let Some(folder) = parent_folder else {
        free_all(&pidls_full);
        return Err(MenuError::Enumeration("No parent folder for selection".to_string()));
    };
    let context_menu: std::result::Result<IContextMenu, _> =
        folder.GetUIObjectOf(HWND::default(), &pidls_relative, None);

    let result = match context_menu {
        Ok(cm) => f(&cm),
        Err(e) => Err(MenuError::Enumeration(format!("GetUIObjectOf failed: {}", e))),
    };

    free_all(&pidls_full);
    result
}

unsafe fn scrape_level(
    hmenu: HMENU,
    context_menu: &IContextMenu,
    cm2: Option<&IContextMenu2>,
    cm3: Option<&IContextMenu3>,
    filter: &VerbFilter,
) -> Vec<RawMenuEntry> {
    let count = GetMenuItemCount(Some(hmenu));
    if count < 0 {
        return Vec::new();
    }

    let mut items = Vec::new();
    for i in 0..count {
        let id = GetMenuItemID(hmenu, i);
        let submenu = GetSubMenu(hmenu, i);

        // Cascades must be initialized before extensions populate them.
        if !submenu.is_invalid() {
            let wparam = WPARAM(submenu.0 as usize);
            let lparam = LPARAM((i & 0xFFFF) as isize);
            if let Some(cm) = cm2 {
                let _ = cm.HandleMenuMsg(WM_INITMENUPOPUP, wparam, lparam);
            } else if let Some(cm) = cm3 {
                let _ = cm.HandleMenuMsg(WM_INITMENUPOPUP, wparam, lparam);
            }
        }

        let mut info = MENUITEMINFOW {
            cbSize: std::mem::size_of::<MENUITEMINFOW>() as u32,
            fMask: MIIM_FTYPE | MIIM_BITMAP,
            ..Default::default()
        };
        let _ = GetMenuItemInfoW(hmenu, i as u32, true, &mut info);

        if (info.fType.0 & MFT_SEPARATOR.0) != 0 {
            items.push(RawMenuEntry::separator());
            continue;
        }

        let mut label_buf = [0u16; 256];
        let len = GetMenuStringW(hmenu, i as u32, Some(&mut label_buf), MF_BYPOSITION);
        let label = String::from_utf16_lossy(&label_buf[..len as usize]);

        let verb = if (ID_FIRST..=ID_LAST).contains(&id) {
            command_verb(context_menu, id)
        } else {
            None
        };

        // Verbs the host renders itself are dropped, but a cascade stays: its
        // children may come from extensions the host knows nothing about.
        if submenu.is_invalid() {
            if let Some(v) = &verb {
                if filter.excludes(v) {
                    continue;
                }
            }
        }

        let icon = icon_bytes(info.hbmpItem);

        // GetMenuItemID reports (UINT)-1 for items that open submenus; that
        // sentinel is not an id and must not leave the scraper as one.
        let entry_id = if id == u32::MAX { 0 } else { id as i32 };

        if !submenu.is_invalid() {
            let children = scrape_level(submenu, context_menu, cm2, cm3, filter);
            items.push(RawMenuEntry {
                id: entry_id,
                label,
                verb,
                kind: RawEntryKind::SubMenu,
                icon,
                children,
            });
        } else {
            items.push(RawMenuEntry {
                id: entry_id,
                label,
                verb,
                kind: RawEntryKind::Action,
                icon,
                children: Vec::new(),
            });
        }
    }
    items
}

unsafe fn command_verb(context_menu: &IContextMenu, id: u32) -> Option<String> {
    let mut verb_buf = [0u8; 128];
    context_menu
        .GetCommandString(
            (id - 1) as usize,
            GCS_VERBA,
            None,
            PSTR(verb_buf.as_mut_ptr()),
            verb_buf.len() as u32,
        )
        .ok()?;
    let verb = std::ffi::CStr::from_ptr(verb_buf.as_ptr() as *const i8)
        .to_string_lossy()
        .to_string();
    (!verb.is_empty()).then_some(verb)
}

unsafe fn init_all_submenus(hmenu: HMENU, cm2: Option<&IContextMenu2>, cm3: Option<&IContextMenu3>) {
    let count = GetMenuItemCount(Some(hmenu));
    for i in 0..count {
        let submenu = GetSubMenu(hmenu, i);
        if !submenu.is_invalid() {
            let wparam = WPARAM(submenu.0 as usize);
            let lparam = LPARAM((i & 0xFFFF) as isize);
            if let Some(cm) = cm2 {
                let _ = cm.HandleMenuMsg(WM_INITMENUPOPUP, wparam, lparam);
            } else if let Some(cm) = cm3 {
                let _ = cm.HandleMenuMsg(WM_INITMENUPOPUP, wparam, lparam);
            }
            init_all_submenus(submenu, cm2, cm3);
        }
    }
}

/// Reads the per-item menu bitmap into PNG bytes. HBMMENU_* magic values
/// (small integers posing as handles) are skipped.
unsafe fn icon_bytes(hbm: HBITMAP) -> Vec<u8> {
    if hbm.is_invalid() || (hbm.0 as usize) <= 12 {
        return Vec::new();
    }

    let mut bitmap = BITMAP::default();
    if GetObjectW(
        HGDIOBJ(hbm.0),
        std::mem::size_of::<BITMAP>() as i32,
        Some(&mut bitmap as *mut _ as *mut _),
    ) == 0
    {
        return Vec::new();
    }

    let width = bitmap.bmWidth;
    let height = bitmap.bmHeight;
    if width <= 0 || height <= 0 {
        return Vec::new();
    }

    let dc = GetDC(None);
    if dc.is_invalid() {
        return Vec::new();
    }

    let mut bi = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            biHeight: -height, // top-down
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut pixels = vec![0u8; (width * height * 4) as usize];
    let copied = GetDIBits(
        dc,
        hbm,
        0,
        height as u32,
        Some(pixels.as_mut_ptr() as *mut _),
        &mut bi,
        DIB_RGB_COLORS,
    );
    let _ = ReleaseDC(None, dc);
    if copied == 0 {
        return Vec::new();
    }

    // BGRA -> RGBA
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }

    let img = match image::RgbaImage::from_raw(width as u32, height as u32, pixels) {
        Some(img) => img,
        None => return Vec::new(),
    };
    let mut png = Vec::new();
    if img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png).is_err() {
        return Vec::new();
    }
    png
}

pub struct WindowsFontInstaller;

impl FontInstaller for WindowsFontInstaller {
    fn install(&self, font_path: &Path, all_users: bool) -> Result<()> {
        let path = validate_path(&font_path.to_string_lossy())?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| MenuError::FontInstall(format!("Not a font file: {:?}", path)))?;

        let dir = if all_users {
            let windir = std::env::var("WINDIR").unwrap_or_else(|_| "C:\\Windows".to_string());
            format!("{}\\Fonts", windir)
        } else {
            let local = std::env::var("LOCALAPPDATA")
                .map_err(|_| MenuError::FontInstall("LOCALAPPDATA is not set".to_string()))?;
            format!("{}\\Microsoft\\Windows\\Fonts", local)
        };
        let registry_key = if all_users {
            "HKLM:\\Software\\Microsoft\\Windows NT\\CurrentVersion\\Fonts"
        } else {
            "HKCU:\\Software\\Microsoft\\Windows NT\\CurrentVersion\\Fonts"
        };

        log::info!("Installing font {:?} to {} (all users: {})", path, dir, all_users);
        let script = format!(
            "Copy-Item '{}' '{}'; New-ItemProperty -Name '{}' -Path '{}' -PropertyType string -Value '{}'",
            path.display(),
            dir,
            name,
            registry_key,
            dir
        );
        run_powershell(&script, all_users).map_err(|e| MenuError::FontInstall(e.to_string()))
    }
}

pub struct WindowsDiskServices;

impl DiskServices for WindowsDiskServices {
    fn mount(&self, image_path: &Path) -> Result<()> {
        let pb = validate_path(&image_path.to_string_lossy())?;
        log::info!("Mounting disk image: {:?}", pb);
        let script = format!(
            "$OutputEncoding = [Console]::OutputEncoding = [System.Text.Encoding]::UTF8; \
            Mount-DiskImage -ImagePath \"{}\"",
            pb.to_string_lossy()
        );
        run_powershell(&script, false)
            .map_err(|e| MenuError::SystemError(format!("Failed to mount image: {}", e)))
    }

    fn open_format_dialog(&self, drive_path: &Path) -> Result<()> {
        let drive_letter = drive_path
            .to_string_lossy()
            .chars()
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or_else(|| MenuError::PathError(format!("Not a drive path: {:?}", drive_path)))?;
        let drive_index = (drive_letter.to_ascii_uppercase() as u8 - b'A') as u32;

        log::info!("Opening format dialog for drive {}:", drive_letter);
        unsafe {
            SHFormatDrive(HWND::default(), drive_index, SHFMT_ID_DEFAULT, SHFMT_OPT(0));
        }
        Ok(())
    }
}

fn run_powershell(script: &str, elevated: bool) -> std::result::Result<(), String> {
    let output = if elevated {
        // Elevation goes through a second PowerShell so the UAC prompt is
        // attached to the inner command, not to the host process.
        let escaped = script.replace('\'', "''");
        Command::new("powershell")
            .arg("-NoProfile")
            .arg("-Command")
            .arg(format!(
                "Start-Process powershell -Verb RunAs -WindowStyle Hidden -Wait -ArgumentList '-NoProfile','-Command','{}'",
                escaped
            ))
            .creation_flags(CREATE_NO_WINDOW)
            .output()
    } else {
        Command::new("powershell")
            .arg("-NoProfile")
            .arg("-Command")
            .arg(script)
            .creation_flags(CREATE_NO_WINDOW)
            .output()
    }
    .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).to_string());
    }
    Ok(())
}

//! Desktop capture through GDI, used by the primary-screen backend on Windows.

use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
    GetDIBits, GetDeviceCaps, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
    DESKTOPHORZRES, DESKTOPVERTRES, DIB_RGB_COLORS, SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

/// Size of the primary screen in logical pixels.
///
/// The process is not DPI aware, so `GetSystemMetrics` reports the scaled
/// (logical) resolution.
pub fn logical_screen_size() -> Result<(u32, u32)> {
    let (w, h) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
    if w <= 0 || h <= 0 {
        return Err(anyhow!("GetSystemMetrics returned {}x{}", w, h));
    }
    Ok((w as u32, h as u32))
}

/// Copies the primary screen at physical resolution.
pub fn capture_desktop() -> Result<RgbaImage> {
    unsafe {
        let screen_dc = GetDC(HWND::default());
        if screen_dc.is_invalid() {
            return Err(anyhow!("GetDC failed for the desktop"));
        }

        let width = GetDeviceCaps(screen_dc, DESKTOPHORZRES);
        let height = GetDeviceCaps(screen_dc, DESKTOPVERTRES);
        if width <= 0 || height <= 0 {
            ReleaseDC(HWND::default(), screen_dc);
            return Err(anyhow!("Desktop reports size {}x{}", width, height));
        }

        let mem_dc = CreateCompatibleDC(screen_dc);
        let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
        let previous = SelectObject(mem_dc, bitmap);

        let copied = BitBlt(mem_dc, 0, 0, width, height, screen_dc, 0, 0, SRCCOPY);

        // Negative height requests a top-down DIB
        let mut info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut buffer = vec![0u8; (width * height * 4) as usize];
        let lines = GetDIBits(
            mem_dc,
            bitmap,
            0,
            height as u32,
            Some(buffer.as_mut_ptr() as *mut _),
            &mut info,
            DIB_RGB_COLORS,
        );

        SelectObject(mem_dc, previous);
        let _ = DeleteObject(bitmap);
        let _ = DeleteDC(mem_dc);
        ReleaseDC(HWND::default(), screen_dc);

        copied.map_err(|e| anyhow!("BitBlt failed: {}", e))?;
        if lines == 0 {
            return Err(anyhow!("GetDIBits copied no scanlines"));
        }

        // BGRA -> RGBA
        let img = RgbaImage::from_fn(width as u32, height as u32, |x, y| {
            let offset = ((y * width as u32 + x) * 4) as usize;
            Rgba([buffer[offset + 2], buffer[offset + 1], buffer[offset], 255])
        });
        Ok(img)
    }
}

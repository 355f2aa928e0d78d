//! Whole-desktop screenshots.

use anyhow::Result;
use image::RgbaImage;

/// A screenshot of the virtual desktop.
///
/// `origin` is the desktop coordinate of the image's top-left pixel. It is
/// negative when a monitor sits left of or above the primary one.
pub struct Screenshot {
    pub image: RgbaImage,
    pub origin: (i32, i32),
}

/// Captures every monitor into one image.
pub fn capture_screen() -> Result<Screenshot> {
    platform::capture_virtual_screen()
}

#[cfg(windows)]
mod platform {
    use anyhow::{Result, anyhow, bail};
    use image::{Rgba, RgbaImage};
    use windows::Win32::Foundation::HWND;
    use windows::Win32::Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CAPTUREBLT, CreateCompatibleBitmap,
        CreateCompatibleDC, DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits, HGDIOBJ,
        ROP_CODE, ReleaseDC, SRCCOPY, SelectObject,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
        SM_YVIRTUALSCREEN,
    };

    use super::Screenshot;

    pub fn capture_virtual_screen() -> Result<Screenshot> {
        let (left, top, width, height) = unsafe {
            (
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        };
        if width <= 0 || height <= 0 {
            bail!("Virtual screen has no area ({}x{})", width, height);
        }

        let mut bgra = vec![0u8; width as usize * height as usize * 4];

        unsafe {
            let screen_dc = GetDC(HWND::default());
            if screen_dc.is_invalid() {
                bail!("GetDC failed for the desktop");
            }
            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
            let previous = SelectObject(mem_dc, HGDIOBJ(bitmap.0));

            let blit = BitBlt(
                mem_dc,
                0,
                0,
                width,
                height,
                screen_dc,
                left,
                top,
                ROP_CODE(SRCCOPY.0 | CAPTUREBLT.0),
            );

            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    // Negative height gives a top-down DIB
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let lines = if blit.is_ok() {
                GetDIBits(
                    mem_dc,
                    bitmap,
                    0,
                    height as u32,
                    Some(bgra.as_mut_ptr().cast()),
                    &mut info,
                    DIB_RGB_COLORS,
                )
            } else {
                0
            };

            SelectObject(mem_dc, previous);
            let _ = DeleteObject(HGDIOBJ(bitmap.0));
            let _ = DeleteDC(mem_dc);
            let _ = ReleaseDC(HWND::default(), screen_dc);

            blit.map_err(|e| anyhow!("BitBlt failed: {}", e))?;
            if lines != height {
                bail!("GetDIBits copied {} of {} lines", lines, height);
            }
        }

        let image = RgbaImage::from_fn(width as u32, height as u32, |x, y| {
            let i = (y as usize * width as usize + x as usize) * 4;
            Rgba([bgra[i + 2], bgra[i + 1], bgra[i], 255])
        });

        Ok(Screenshot {
            image,
            origin: (left, top),
        })
    }
}

#[cfg(not(windows))]
mod platform {
    use anyhow::{Result, bail};

    use super::Screenshot;

    pub fn capture_virtual_screen() -> Result<Screenshot> {
        bail!("Screen capture is only supported on Windows")
    }
}

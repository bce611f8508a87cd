use fast_qr::convert::{Builder, Shape, svg::SvgBuilder};
use fast_qr::qr::{QRBuilder, QRCodeError};
use fast_qr::ECL;

/// Encode `url` as an inline SVG QR code.
pub fn render_svg(url: &str) -> Result<String, QRCodeError> {
    let qrcode = QRBuilder::new(url).ecl(ECL::M).build()?;
    Ok(SvgBuilder::default().shape(Shape::Square).to_str(&qrcode))
}

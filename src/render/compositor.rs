use vello_cpu::kurbo::{Affine, BezPath, Circle, Rect, Shape as _, Vec2};

use crate::{
    foundation::core::{Point, Rgb8},
    foundation::error::{DotlinkError, DotlinkResult},
    order::VisitOrder,
    render::{
        FrameRGBA, RenderStyle,
        font::{BitmapFont, LabelFont},
    },
};

const OUTLINE_PX: f64 = 2.0;
const HALO_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// The connection currently being drawn and how far along it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PartialConnection {
    /// Connection rank, `0..N-1`.
    pub index: usize,
    /// Fraction of the segment drawn, clamped to `[0, 1]`.
    pub progress: f64,
}

/// CPU compositor for dot-to-dot frames.
///
/// Draw order, back to front: background, completed connections, the partial connection,
/// dots, labels. The render context is reused across frames.
pub struct FrameCompositor {
    style: RenderStyle,
    font: Box<dyn LabelFont>,
    width: u16,
    height: u16,
    ctx: Option<vello_cpu::RenderContext>,
}

impl FrameCompositor {
    pub fn new(style: RenderStyle, font: Box<dyn LabelFont>) -> DotlinkResult<Self> {
        let width: u16 = style
            .canvas
            .width
            .try_into()
            .map_err(|_| DotlinkError::validation("canvas width exceeds u16"))?;
        let height: u16 = style
            .canvas
            .height
            .try_into()
            .map_err(|_| DotlinkError::validation("canvas height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(DotlinkError::validation("canvas must be non-empty"));
        }
        Ok(Self {
            style,
            font,
            width,
            height,
            ctx: None,
        })
    }

    pub fn with_bitmap_font(style: RenderStyle) -> DotlinkResult<Self> {
        Self::new(style, Box::new(BitmapFont))
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Dots only.
    pub fn render_initial(
        &mut self,
        points: &[Point],
        order: &VisitOrder,
    ) -> DotlinkResult<FrameRGBA> {
        self.render_frame(points, order, 0, None)
    }

    /// Dots with every connection drawn.
    pub fn render_final(
        &mut self,
        points: &[Point],
        order: &VisitOrder,
    ) -> DotlinkResult<FrameRGBA> {
        self.render_frame(points, order, order.connection_count(), None)
    }

    /// Render one frame with connections `0..drawn_connections` complete and an optional
    /// partially drawn connection on top of them.
    pub fn render_frame(
        &mut self,
        points: &[Point],
        order: &VisitOrder,
        drawn_connections: usize,
        partial: Option<PartialConnection>,
    ) -> DotlinkResult<FrameRGBA> {
        if points.len() != order.len() {
            return Err(DotlinkError::validation(format!(
                "visit order covers {} points but {} were given",
                order.len(),
                points.len()
            )));
        }
        if let Some(p) = partial
            && p.index >= order.connection_count()
        {
            return Err(DotlinkError::validation(format!(
                "partial connection {} out of range ({} connections)",
                p.index,
                order.connection_count()
            )));
        }

        let mut ctx = match self.ctx.take() {
            Some(ctx) => ctx,
            None => vello_cpu::RenderContext::new(self.width, self.height),
        };
        ctx.reset();

        let out = self.draw(&mut ctx, points, order, drawn_connections, partial);
        let frame = out.map(|()| {
            ctx.flush();
            let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
            ctx.render_to_pixmap(&mut pixmap);
            FrameRGBA {
                width: u32::from(self.width),
                height: u32::from(self.height),
                data: pixmap.data_as_u8_slice().to_vec(),
                premultiplied: true,
            }
        });
        self.ctx = Some(ctx);
        frame
    }

    fn draw(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        points: &[Point],
        order: &VisitOrder,
        drawn_connections: usize,
        partial: Option<PartialConnection>,
    ) -> DotlinkResult<()> {
        let style = &self.style;
        ctx.set_transform(Affine::IDENTITY);

        set_color(ctx, style.background);
        ctx.fill_rect(&Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height)));

        let line_width = f64::from(style.line_width);
        set_color(ctx, style.line_color);
        for (from, to) in order.connections().take(drawn_connections) {
            let (a, b) = (pixel_center(points[from]), pixel_center(points[to]));
            if let Some(path) = segment_path(a, b, line_width) {
                ctx.fill_path(&path);
            }
        }

        if let Some(p) = partial
            && p.progress > 0.0
            && let Some((from, to)) = order.connection(p.index)
        {
            let a = pixel_center(points[from]);
            let b = pixel_center(points[to]);
            let tip = a.lerp(b, p.progress.min(1.0));
            if let Some(path) = segment_path(a, tip, line_width) {
                ctx.fill_path(&path);
            }
        }

        let radius = f64::from(style.dot_radius);
        for &pt in points {
            let c = pixel_center(pt);
            set_color(ctx, Rgb8::BLACK);
            ctx.fill_path(&Circle::new(c, radius).to_path(0.1));
            set_color(ctx, style.dot_color);
            ctx.fill_path(&Circle::new(c, (radius - OUTLINE_PX).max(0.0)).to_path(0.1));
        }

        if style.show_numbers {
            let size = style.label_size;
            for (pt, rank) in points.iter().zip(order.ranks()) {
                let text = rank.to_string();
                let extent = self.font.measure(&text, size)?;
                let x = pt.x - (extent.width / 2) as i32;
                let y = pt.y - (extent.height / 2) as i32;
                for (dx, dy) in HALO_OFFSETS {
                    self.font.draw(ctx, &text, size, (x + dx, y + dy), Rgb8::WHITE)?;
                }
                self.font.draw(ctx, &text, size, (x, y), Rgb8::BLACK)?;
            }
            ctx.set_transform(Affine::IDENTITY);
        }

        Ok(())
    }
}

fn set_color(ctx: &mut vello_cpu::RenderContext, c: Rgb8) {
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, 255));
}

/// Integer canvas coordinates address pixels; geometry is placed on pixel centers.
fn pixel_center(p: Point) -> vello_cpu::kurbo::Point {
    let k = p.to_kurbo();
    vello_cpu::kurbo::Point::new(k.x + 0.5, k.y + 0.5)
}

/// Butt-capped segment of `width` as a filled quad. `None` when the segment is degenerate.
fn segment_path(
    a: vello_cpu::kurbo::Point,
    b: vello_cpu::kurbo::Point,
    width: f64,
) -> Option<BezPath> {
    let d = b - a;
    let len = d.hypot();
    if len < 1e-6 {
        return None;
    }
    let n = Vec2::new(-d.y, d.x) * (width * 0.5 / len);

    let mut path = BezPath::new();
    path.move_to(a + n);
    path.line_to(b + n);
    path.line_to(b - n);
    path.line_to(a - n);
    path.close_path();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_segments_are_skipped() {
        let a = vello_cpu::kurbo::Point::new(10.5, 10.5);
        assert!(segment_path(a, a, 3.0).is_none());
        assert!(segment_path(a, vello_cpu::kurbo::Point::new(20.5, 10.5), 3.0).is_some());
    }

    #[test]
    fn oversized_canvas_is_rejected() {
        let mut style = RenderStyle::default();
        style.canvas.width = 70_000;
        assert!(FrameCompositor::with_bitmap_font(style).is_err());
    }

    #[test]
    fn mismatched_order_is_rejected() {
        let mut comp = FrameCompositor::with_bitmap_font(RenderStyle::default()).unwrap();
        let pts = [Point::new(100, 100), Point::new(200, 100)];
        let order = VisitOrder::identity(3);
        assert!(comp.render_initial(&pts, &order).is_err());
    }

    #[test]
    fn partial_index_must_name_a_connection() {
        let mut comp = FrameCompositor::with_bitmap_font(RenderStyle::default()).unwrap();
        let pts = [Point::new(100, 100), Point::new(200, 100)];
        let order = VisitOrder::identity(2);
        let partial = PartialConnection {
            index: 1,
            progress: 0.5,
        };
        assert!(comp.render_frame(&pts, &order, 0, Some(partial)).is_err());
    }

    #[test]
    fn identical_inputs_render_identically() {
        let mut comp = FrameCompositor::with_bitmap_font(RenderStyle::default()).unwrap();
        let pts = [
            Point::new(100, 100),
            Point::new(200, 100),
            Point::new(150, 200),
        ];
        let order = VisitOrder::identity(3);
        let a = comp.render_final(&pts, &order).unwrap();
        let b = comp.render_final(&pts, &order).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.data.len(), 512 * 512 * 4);
    }
}

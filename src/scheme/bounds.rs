//! Габариты фигур схемы в пользовательских координатах.
//!
//! Аналог `getBBox()` без браузера: прямоугольники, круги, эллипсы, линии,
//! полилинии и пути (по опорным точкам, включая контрольные точки кривых),
//! группы - объединением потомков. `transform` учитывается для узла и всех предков.

use super::{NodeId, NodeKind, SceneGraph, SceneNode};
use crate::geometry::{BoundsAcc, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    fn translate(x: f64, y: f64) -> Self {
        Self { e: x, f: y, ..Self::IDENTITY }
    }

    fn scale(sx: f64, sy: f64) -> Self {
        Self { a: sx, d: sy, ..Self::IDENTITY }
    }

    fn rotate(deg: f64) -> Self {
        let (sin, cos) = deg.to_radians().sin_cos();
        Self { a: cos, b: sin, c: -sin, d: cos, e: 0.0, f: 0.0 }
    }

    /// self * other (сначала применяется other).
    pub fn then(self, other: Affine) -> Affine {
        Affine {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    pub fn apply_rect(&self, rect: &Rect) -> Rect {
        let mut acc = BoundsAcc::default();
        for (x, y) in [
            (rect.x, rect.y),
            (rect.right(), rect.y),
            (rect.x, rect.bottom()),
            (rect.right(), rect.bottom()),
        ] {
            let (tx, ty) = self.apply(x, y);
            acc.point(tx, ty);
        }
        acc.finish().unwrap_or(*rect)
    }
}

/// Разбор списка `translate(..) scale(..) rotate(..) matrix(..)`.
pub fn parse_transform(raw: &str) -> Affine {
    let mut result = Affine::IDENTITY;
    let mut rest = raw.trim();

    while let Some(open) = rest.find('(') {
        let name = rest[..open].trim().trim_start_matches(',').trim();
        let Some(close) = rest[open..].find(')') else { break };
        let args = numbers(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];

        let op = match (name, args.as_slice()) {
            ("translate", [x]) => Affine::translate(*x, 0.0),
            ("translate", [x, y, ..]) => Affine::translate(*x, *y),
            ("scale", [s]) => Affine::scale(*s, *s),
            ("scale", [sx, sy, ..]) => Affine::scale(*sx, *sy),
            ("rotate", [deg]) => Affine::rotate(*deg),
            ("rotate", [deg, cx, cy, ..]) => Affine::translate(*cx, *cy)
                .then(Affine::rotate(*deg))
                .then(Affine::translate(-cx, -cy)),
            ("matrix", [a, b, c, d, e, f, ..]) => Affine { a: *a, b: *b, c: *c, d: *d, e: *e, f: *f },
            _ => continue,
        };
        result = result.then(op);
    }
    result
}

/// Числа из атрибута (`points`, аргументы transform, параметры пути).
pub fn numbers(raw: &str) -> Vec<f64> {
    PathTokens::new(raw)
        .filter_map(|token| match token {
            Token::Number(n) => Some(n),
            Token::Command(_) => None,
        })
        .collect()
}

pub fn parse_length(raw: &str) -> Option<f64> {
    raw.trim().trim_end_matches("px").trim().parse().ok()
}

fn num_attr(node: &SceneNode, name: &str) -> f64 {
    node.attr(name).and_then(parse_length).unwrap_or(0.0)
}

/// Габариты узла без учёта transform (для групп - объединение потомков с их transform).
pub fn local_bounds(graph: &SceneGraph, id: NodeId) -> Option<Rect> {
    let node = graph.node(id)?;
    match node.tag()? {
        "rect" | "image" | "foreignObject" => {
            let rect = Rect::new(
                num_attr(node, "x"),
                num_attr(node, "y"),
                num_attr(node, "width"),
                num_attr(node, "height"),
            );
            (rect.width >= 0.0 && rect.height >= 0.0).then_some(rect)
        }
        "circle" => {
            let r = num_attr(node, "r");
            let (cx, cy) = (num_attr(node, "cx"), num_attr(node, "cy"));
            Some(Rect::new(cx - r, cy - r, 2.0 * r, 2.0 * r))
        }
        "ellipse" => {
            let (rx, ry) = (num_attr(node, "rx"), num_attr(node, "ry"));
            let (cx, cy) = (num_attr(node, "cx"), num_attr(node, "cy"));
            Some(Rect::new(cx - rx, cy - ry, 2.0 * rx, 2.0 * ry))
        }
        "line" => {
            let mut acc = BoundsAcc::default();
            acc.point(num_attr(node, "x1"), num_attr(node, "y1"));
            acc.point(num_attr(node, "x2"), num_attr(node, "y2"));
            acc.finish()
        }
        "polygon" | "polyline" => {
            let points = numbers(node.attr("points")?);
            let mut acc = BoundsAcc::default();
            for pair in points.chunks_exact(2) {
                acc.point(pair[0], pair[1]);
            }
            acc.finish()
        }
        "path" => path_bounds(node.attr("d")?),
        "text" => text_bounds(graph, node),
        "g" | "a" | "svg" | "switch" => {
            let mut acc = BoundsAcc::default();
            for &child in &node.children {
                if let Some(rect) = transformed_bounds(graph, child) {
                    acc.rect(&rect);
                }
            }
            acc.finish()
        }
        _ => None,
    }
}

const DEFAULT_FONT_SIZE: f64 = 16.0;
// средняя ширина глифа в долях кегля
const GLYPH_WIDTH: f64 = 0.6;

/// Оценка габаритов `<text>` без шрифтов: кегль по высоте, ширина по числу символов.
fn text_bounds(graph: &SceneGraph, node: &SceneNode) -> Option<Rect> {
    let content: String = node
        .children
        .iter()
        .flat_map(|&child| graph.descendants(child))
        .filter_map(|id| match &graph.node(id)?.kind {
            NodeKind::Text(text) => Some(text.trim().to_string()),
            NodeKind::Element { .. } => None,
        })
        .collect::<Vec<_>>()
        .join(" ");
    let chars = content.chars().count();
    if chars == 0 {
        return None;
    }

    let size = node
        .attr("font-size")
        .and_then(parse_length)
        .filter(|size| *size > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE);
    let width = chars as f64 * size * GLYPH_WIDTH;
    let (x, y) = (num_attr(node, "x"), num_attr(node, "y"));
    let left = match node.attr("text-anchor") {
        Some("middle") => x - width / 2.0,
        Some("end") => x - width,
        _ => x,
    };
    // y - базовая линия
    Some(Rect::new(left, y - size, width, size))
}

/// Габариты узла в системе координат родителя.
pub fn transformed_bounds(graph: &SceneGraph, id: NodeId) -> Option<Rect> {
    let node = graph.node(id)?;
    // вложенный <svg> ведёт себя как группа, корень же не трансформируем
    if node.tag() == Some("svg") && node.parent.is_none() {
        return local_bounds(graph, id);
    }
    let local = local_bounds(graph, id)?;
    Some(match node.attr("transform") {
        Some(raw) => parse_transform(raw).apply_rect(&local),
        None => local,
    })
}

/// Габариты в координатах корня схемы.
pub fn node_bounds(graph: &SceneGraph, id: NodeId) -> Option<Rect> {
    let mut rect = transformed_bounds(graph, id)?;
    let mut parent = graph.node(id)?.parent;
    while let Some(pid) = parent {
        let node = graph.node(pid)?;
        if node.parent.is_none() {
            break;
        }
        if let Some(raw) = node.attr("transform") {
            rect = parse_transform(raw).apply_rect(&rect);
        }
        parent = node.parent;
    }
    Some(rect)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(char),
    Number(f64),
}

struct PathTokens<'a> {
    bytes: &'a [u8],
    src: &'a str,
    pos: usize,
}

impl<'a> PathTokens<'a> {
    fn new(src: &'a str) -> Self {
        Self { bytes: src.as_bytes(), src, pos: 0 }
    }

    /// Флаг дуги - ровно один символ `0`/`1`, даже без разделителя (`a1 1 0 011 1`).
    fn next_flag(&mut self) -> Option<Token> {
        while matches!(self.bytes.get(self.pos), Some(c) if c.is_ascii_whitespace() || *c == b',') {
            self.pos += 1;
        }
        match self.bytes.get(self.pos) {
            Some(&flag @ (b'0' | b'1')) => {
                self.pos += 1;
                Some(Token::Number(f64::from(flag - b'0')))
            }
            _ => self.next(),
        }
    }
}

impl Iterator for PathTokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            if c.is_ascii_whitespace() || c == b',' {
                self.pos += 1;
                continue;
            }
            if c.is_ascii_alphabetic() && c != b'e' && c != b'E' {
                self.pos += 1;
                return Some(Token::Command(c as char));
            }

            // число: [+-]? цифры [. цифры] [eE [+-] цифры]
            let start = self.pos;
            let mut end = start;
            if matches!(self.bytes[end], b'+' | b'-') {
                end += 1;
            }
            let mut seen_dot = false;
            while end < self.bytes.len() {
                match self.bytes[end] {
                    b'0'..=b'9' => end += 1,
                    b'.' if !seen_dot => {
                        seen_dot = true;
                        end += 1;
                    }
                    b'e' | b'E' => {
                        end += 1;
                        if end < self.bytes.len() && matches!(self.bytes[end], b'+' | b'-') {
                            end += 1;
                        }
                        while end < self.bytes.len() && self.bytes[end].is_ascii_digit() {
                            end += 1;
                        }
                        break;
                    }
                    _ => break,
                }
            }
            if end == start {
                // неизвестный символ - пропускаем
                self.pos += 1;
                continue;
            }
            self.pos = end;
            match self.src[start..end].parse() {
                Ok(n) => return Some(Token::Number(n)),
                Err(_) => continue,
            }
        }
        None
    }
}

fn arity(command: char) -> usize {
    match command.to_ascii_uppercase() {
        'M' | 'L' | 'T' => 2,
        'H' | 'V' => 1,
        'S' | 'Q' => 4,
        'C' => 6,
        'A' => 7,
        _ => 0,
    }
}

/// Габариты пути по всем опорным и контрольным точкам (оболочка кривой).
pub fn path_bounds(d: &str) -> Option<Rect> {
    let mut acc = BoundsAcc::default();
    let (mut cx, mut cy) = (0.0_f64, 0.0_f64);
    let (mut sx, mut sy) = (0.0_f64, 0.0_f64);
    let mut command: Option<char> = None;
    let mut args: Vec<f64> = Vec::with_capacity(7);

    let mut tokens = PathTokens::new(d);
    loop {
        let in_flags =
            command.is_some_and(|c| c.eq_ignore_ascii_case(&'a')) && matches!(args.len(), 3 | 4);
        let token = if in_flags { tokens.next_flag() } else { tokens.next() };
        let Some(token) = token else { break };
        match token {
            Token::Command(c) => {
                args.clear();
                command = Some(c);
                if c.eq_ignore_ascii_case(&'z') {
                    cx = sx;
                    cy = sy;
                }
                continue;
            }
            Token::Number(n) => args.push(n),
        }

        let Some(cmd) = command else { continue };
        let need = arity(cmd);
        if need == 0 || args.len() < need {
            continue;
        }

        let rel = cmd.is_ascii_lowercase();
        let (ox, oy) = if rel { (cx, cy) } else { (0.0, 0.0) };
        match cmd.to_ascii_uppercase() {
            'M' | 'L' | 'T' => {
                cx = ox + args[0];
                cy = oy + args[1];
                acc.point(cx, cy);
                if cmd.eq_ignore_ascii_case(&'m') {
                    sx = cx;
                    sy = cy;
                    // последующие пары после moveto - это lineto
                    command = Some(if rel { 'l' } else { 'L' });
                }
            }
            'H' => {
                cx = if rel { cx + args[0] } else { args[0] };
                acc.point(cx, cy);
            }
            'V' => {
                cy = if rel { cy + args[0] } else { args[0] };
                acc.point(cx, cy);
            }
            'S' | 'Q' | 'C' => {
                for pair in args.chunks_exact(2) {
                    acc.point(ox + pair[0], oy + pair[1]);
                }
                cx = ox + args[need - 2];
                cy = oy + args[need - 1];
            }
            'A' => {
                cx = ox + args[5];
                cy = oy + args[6];
                acc.point(cx, cy);
            }
            _ => {}
        }
        args.clear();
    }

    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::parse::parse;

    #[test]
    fn path_bounds_handle_relative_and_compact_numbers() {
        let rect = path_bounds("M10-5l5.5.5h-20v10z").unwrap();
        assert_eq!(rect, Rect::from_corners(-4.5, -5.0, 15.5, 5.5));
    }

    #[test]
    fn path_bounds_include_curve_controls() {
        let rect = path_bounds("M 0 0 C 0 10 10 10 10 0").unwrap();
        assert_eq!(rect, Rect::from_corners(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn arc_flags_without_separators() {
        let compact = path_bounds("M0 0a1 1 0 011 1l2 2").unwrap();
        let spaced = path_bounds("M0 0a1 1 0 0 1 1 1l2 2").unwrap();
        assert_eq!(compact, spaced);
        assert_eq!(compact, Rect::from_corners(0.0, 0.0, 3.0, 3.0));
    }

    #[test]
    fn text_box_from_font_size() {
        let graph = parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text x="50" y="20" font-size="10" text-anchor="middle">Fan</text></svg>"#,
        )
        .unwrap();
        let root = graph.root().unwrap();
        let text = graph.node(root).unwrap().children[0];
        assert_eq!(graph.bounds(text), Some(Rect::new(41.0, 10.0, 18.0, 10.0)));
    }

    #[test]
    fn implicit_lineto_after_moveto() {
        let rect = path_bounds("M 1 1 4 5 -2 3").unwrap();
        assert_eq!(rect, Rect::from_corners(-2.0, 1.0, 4.0, 5.0));
    }

    #[test]
    fn group_transforms_are_applied() {
        let graph = parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
                <g transform="translate(10, 20)">
                    <circle cx="5" cy="5" r="5" transform="scale(2)"/>
                </g>
            </svg>"#,
        )
        .unwrap();
        let root = graph.root().unwrap();
        let group = graph.node(root).unwrap().children[0];
        let circle = graph.node(group).unwrap().children[0];
        assert_eq!(graph.bounds(circle), Some(Rect::new(10.0, 20.0, 20.0, 20.0)));
        assert_eq!(graph.bounds(group), Some(Rect::new(10.0, 20.0, 20.0, 20.0)));
    }

    #[test]
    fn polygon_points() {
        let graph = parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><polygon points="0,0 10,0 5,8"/></svg>"#,
        )
        .unwrap();
        let root = graph.root().unwrap();
        let poly = graph.node(root).unwrap().children[0];
        assert_eq!(graph.bounds(poly), Some(Rect::new(0.0, 0.0, 10.0, 8.0)));
    }
}

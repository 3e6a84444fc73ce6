//! Built-in 8×8 font.
//!
//! One glyph per code point from 32 to 255, 8 rows each, most significant
//! bit leftmost, set bits are ink. Past ASCII the table holds a few console
//! symbols (0x80 and 0x81 are the X and Z buttons, 0x84–0x87 the d-pad
//! arrows), blanks for the C1 control range and Latin-1 from 0xA0. Higher
//! code points render as [`PLACEHOLDER`].

pub const GLYPH_SIZE: i32 = 8;

/// First code point with a glyph.
const FIRST: u32 = 32;

/// Hollow box drawn for code points without a glyph.
pub const PLACEHOLDER: [u8; 8] = [0x7E, 0x42, 0x42, 0x42, 0x42, 0x42, 0x7E, 0x00];

static GLYPHS: [[u8; 8]; 224] = [
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // Space
    [0x18,0x18,0x18,0x18,0x18,0x00,0x18,0x00], // !
    [0x6C,0x6C,0x24,0x00,0x00,0x00,0x00,0x00], // "
    [0x6C,0x6C,0xFE,0x6C,0xFE,0x6C,0x6C,0x00], // #
    [0x18,0x3E,0x60,0x3C,0x06,0x7C,0x18,0x00], // $
    [0x00,0x66,0xAC,0xD8,0x36,0x6A,0xCC,0x00], // %
    [0x38,0x6C,0x68,0x76,0xDC,0xCC,0x76,0x00], // &
    [0x18,0x18,0x30,0x00,0x00,0x00,0x00,0x00], // '
    [0x0C,0x18,0x30,0x30,0x30,0x18,0x0C,0x00], // (
    [0x30,0x18,0x0C,0x0C,0x0C,0x18,0x30,0x00], // )
    [0x00,0x66,0x3C,0xFF,0x3C,0x66,0x00,0x00], // *
    [0x00,0x18,0x18,0x7E,0x18,0x18,0x00,0x00], // +
    [0x00,0x00,0x00,0x00,0x00,0x18,0x18,0x30], // ,
    [0x00,0x00,0x00,0x7E,0x00,0x00,0x00,0x00], // -
    [0x00,0x00,0x00,0x00,0x00,0x18,0x18,0x00], // .
    [0x06,0x0C,0x18,0x30,0x60,0xC0,0x80,0x00], // /
    [0x3C,0x66,0x6E,0x7E,0x76,0x66,0x3C,0x00], // 0
    [0x18,0x38,0x18,0x18,0x18,0x18,0x7E,0x00], // 1
    [0x3C,0x66,0x06,0x1C,0x30,0x66,0x7E,0x00], // 2
    [0x3C,0x66,0x06,0x1C,0x06,0x66,0x3C,0x00], // 3
    [0x1C,0x3C,0x6C,0xCC,0xFE,0x0C,0x1E,0x00], // 4
    [0x7E,0x60,0x7C,0x06,0x06,0x66,0x3C,0x00], // 5
    [0x1C,0x30,0x60,0x7C,0x66,0x66,0x3C,0x00], // 6
    [0x7E,0x66,0x06,0x0C,0x18,0x18,0x18,0x00], // 7
    [0x3C,0x66,0x66,0x3C,0x66,0x66,0x3C,0x00], // 8
    [0x3C,0x66,0x66,0x3E,0x06,0x0C,0x38,0x00], // 9
    [0x00,0x18,0x18,0x00,0x18,0x18,0x00,0x00], // :
    [0x00,0x18,0x18,0x00,0x18,0x18,0x30,0x00], // ;
    [0x0C,0x18,0x30,0x60,0x30,0x18,0x0C,0x00], // <
    [0x00,0x00,0x7E,0x00,0x7E,0x00,0x00,0x00], // =
    [0x30,0x18,0x0C,0x06,0x0C,0x18,0x30,0x00], // >
    [0x3C,0x66,0x0C,0x18,0x18,0x00,0x18,0x00], // ?
    [0x3C,0x66,0x6E,0x6A,0x6E,0x60,0x3C,0x00], // @
    [0x3C,0x66,0x66,0x7E,0x66,0x66,0x66,0x00], // A
    [0x7C,0x66,0x66,0x7C,0x66,0x66,0x7C,0x00], // B
    [0x3C,0x66,0x60,0x60,0x60,0x66,0x3C,0x00], // C
    [0x78,0x6C,0x66,0x66,0x66,0x6C,0x78,0x00], // D
    [0x7E,0x60,0x60,0x7C,0x60,0x60,0x7E,0x00], // E
    [0x7E,0x60,0x60,0x7C,0x60,0x60,0x60,0x00], // F
    [0x3C,0x66,0x60,0x6E,0x66,0x66,0x3E,0x00], // G
    [0x66,0x66,0x66,0x7E,0x66,0x66,0x66,0x00], // H
    [0x7E,0x18,0x18,0x18,0x18,0x18,0x7E,0x00], // I
    [0x3E,0x0C,0x0C,0x0C,0x0C,0x6C,0x38,0x00], // J
    [0x66,0x6C,0x78,0x70,0x78,0x6C,0x66,0x00], // K
    [0x60,0x60,0x60,0x60,0x60,0x60,0x7E,0x00], // L
    [0xC6,0xEE,0xFE,0xD6,0xC6,0xC6,0xC6,0x00], // M
    [0x66,0x76,0x7E,0x7E,0x6E,0x66,0x66,0x00], // N
    [0x3C,0x66,0x66,0x66,0x66,0x66,0x3C,0x00], // O
    [0x7C,0x66,0x66,0x7C,0x60,0x60,0x60,0x00], // P
    [0x3C,0x66,0x66,0x66,0x6A,0x6C,0x36,0x00], // Q
    [0x7C,0x66,0x66,0x7C,0x6C,0x66,0x66,0x00], // R
    [0x3C,0x66,0x60,0x3C,0x06,0x66,0x3C,0x00], // S
    [0x7E,0x18,0x18,0x18,0x18,0x18,0x18,0x00], // T
    [0x66,0x66,0x66,0x66,0x66,0x66,0x3C,0x00], // U
    [0x66,0x66,0x66,0x66,0x66,0x3C,0x18,0x00], // V
    [0xC6,0xC6,0xC6,0xD6,0xFE,0xEE,0xC6,0x00], // W
    [0x66,0x66,0x3C,0x18,0x3C,0x66,0x66,0x00], // X
    [0x66,0x66,0x66,0x3C,0x18,0x18,0x18,0x00], // Y
    [0x7E,0x06,0x0C,0x18,0x30,0x60,0x7E,0x00], // Z
    [0x3C,0x30,0x30,0x30,0x30,0x30,0x3C,0x00], // [
    [0xC0,0x60,0x30,0x18,0x0C,0x06,0x02,0x00], // backslash
    [0x3C,0x0C,0x0C,0x0C,0x0C,0x0C,0x3C,0x00], // ]
    [0x18,0x3C,0x66,0x00,0x00,0x00,0x00,0x00], // ^
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0xFF], // _
    [0x30,0x18,0x0C,0x00,0x00,0x00,0x00,0x00], // `
    [0x00,0x00,0x3C,0x06,0x3E,0x66,0x3E,0x00], // a
    [0x60,0x60,0x7C,0x66,0x66,0x66,0x7C,0x00], // b
    [0x00,0x00,0x3C,0x66,0x60,0x66,0x3C,0x00], // c
    [0x06,0x06,0x3E,0x66,0x66,0x66,0x3E,0x00], // d
    [0x00,0x00,0x3C,0x66,0x7E,0x60,0x3C,0x00], // e
    [0x1C,0x30,0x30,0x7C,0x30,0x30,0x30,0x00], // f
    [0x00,0x00,0x3E,0x66,0x66,0x3E,0x06,0x3C], // g
    [0x60,0x60,0x7C,0x66,0x66,0x66,0x66,0x00], // h
    [0x18,0x00,0x38,0x18,0x18,0x18,0x3C,0x00], // i
    [0x18,0x00,0x38,0x18,0x18,0x18,0x18,0x70], // j
    [0x60,0x60,0x66,0x6C,0x78,0x6C,0x66,0x00], // k
    [0x38,0x18,0x18,0x18,0x18,0x18,0x3C,0x00], // l
    [0x00,0x00,0x6C,0xFE,0xD6,0xC6,0xC6,0x00], // m
    [0x00,0x00,0x7C,0x66,0x66,0x66,0x66,0x00], // n
    [0x00,0x00,0x3C,0x66,0x66,0x66,0x3C,0x00], // o
    [0x00,0x00,0x7C,0x66,0x66,0x7C,0x60,0x60], // p
    [0x00,0x00,0x3E,0x66,0x66,0x3E,0x06,0x06], // q
    [0x00,0x00,0x7C,0x66,0x60,0x60,0x60,0x00], // r
    [0x00,0x00,0x3E,0x60,0x3C,0x06,0x7C,0x00], // s
    [0x30,0x30,0x7C,0x30,0x30,0x30,0x1C,0x00], // t
    [0x00,0x00,0x66,0x66,0x66,0x66,0x3E,0x00], // u
    [0x00,0x00,0x66,0x66,0x66,0x3C,0x18,0x00], // v
    [0x00,0x00,0xC6,0xC6,0xD6,0xFE,0x6C,0x00], // w
    [0x00,0x00,0x66,0x3C,0x18,0x3C,0x66,0x00], // x
    [0x00,0x00,0x66,0x66,0x66,0x3E,0x06,0x3C], // y
    [0x00,0x00,0x7E,0x0C,0x18,0x30,0x7E,0x00], // z
    [0x0C,0x18,0x18,0x30,0x18,0x18,0x0C,0x00], // {
    [0x18,0x18,0x18,0x18,0x18,0x18,0x18,0x00], // |
    [0x30,0x18,0x18,0x0C,0x18,0x18,0x30,0x00], // }
    [0x00,0x00,0x76,0xDC,0x00,0x00,0x00,0x00], // ~
    [0x00,0x10,0x38,0x6C,0xC6,0xC6,0xFE,0x00], // house
    [0x3C,0x7E,0xDB,0xE7,0xE7,0xDB,0x7E,0x3C], // button X
    [0x3C,0x7E,0xC3,0xFB,0xF7,0xE1,0x7E,0x3C], // button Z
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x3C,0x7E,0xEF,0xC3,0x83,0xC3,0xEF,0x3C], // left
    [0x3C,0x7E,0xF7,0xC3,0xC1,0xC3,0xF7,0x3C], // right
    [0x3C,0x7E,0xE7,0xC3,0x81,0xE7,0x7E,0x3C], // up
    [0x3C,0x7E,0xE7,0x81,0xC3,0xE7,0x7E,0x3C], // down
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // unused
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // no-break space
    [0x18,0x00,0x18,0x18,0x18,0x18,0x18,0x00], // ¡
    [0x18,0x18,0x3C,0x66,0x60,0x66,0x3C,0x18], // ¢
    [0x1C,0x36,0x30,0x7C,0x30,0x30,0x7E,0x00], // £
    [0x00,0x66,0x3C,0x66,0x66,0x3C,0x66,0x00], // ¤
    [0x66,0x66,0x3C,0x7E,0x18,0x7E,0x18,0x00], // ¥
    [0x18,0x18,0x18,0x00,0x18,0x18,0x18,0x00], // ¦
    [0x3C,0x60,0x3C,0x66,0x3C,0x06,0x3C,0x00], // §
    [0x66,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // ¨
    [0x3C,0x42,0x9D,0xA1,0xA1,0x9D,0x42,0x3C], // ©
    [0x38,0x0C,0x3C,0x6C,0x36,0x00,0x7E,0x00], // ª
    [0x00,0x33,0x66,0xCC,0x66,0x33,0x00,0x00], // «
    [0x00,0x00,0x00,0x7E,0x06,0x06,0x00,0x00], // ¬
    [0x00,0x00,0x00,0x7E,0x00,0x00,0x00,0x00], // soft hyphen
    [0x3C,0x42,0xB9,0xA5,0xB9,0xA5,0x42,0x3C], // ®
    [0x7E,0x00,0x00,0x00,0x00,0x00,0x00,0x00], // ¯
    [0x38,0x6C,0x38,0x00,0x00,0x00,0x00,0x00], // °
    [0x18,0x18,0x7E,0x18,0x18,0x00,0x7E,0x00], // ±
    [0x70,0x18,0x30,0x60,0x78,0x00,0x00,0x00], // ²
    [0x70,0x18,0x30,0x18,0x70,0x00,0x00,0x00], // ³
    [0x0C,0x18,0x00,0x00,0x00,0x00,0x00,0x00], // ´
    [0x00,0x00,0x66,0x66,0x66,0x7C,0x60,0x60], // µ
    [0x3F,0x7B,0x7B,0x3B,0x1B,0x1B,0x1B,0x00], // ¶
    [0x00,0x00,0x00,0x18,0x18,0x00,0x00,0x00], // ·
    [0x00,0x00,0x00,0x00,0x00,0x00,0x18,0x30], // ¸
    [0x30,0x70,0x30,0x30,0x78,0x00,0x00,0x00], // ¹
    [0x38,0x6C,0x6C,0x38,0x00,0x7C,0x00,0x00], // º
    [0x00,0xCC,0x66,0x33,0x66,0xCC,0x00,0x00], // »
    [0x42,0xC4,0x48,0x52,0x26,0x4A,0x9F,0x02], // ¼
    [0x42,0xC4,0x48,0x5C,0x22,0x44,0x88,0x0E], // ½
    [0xE2,0x34,0x68,0x32,0xE6,0x2A,0x5F,0x82], // ¾
    [0x18,0x00,0x18,0x18,0x30,0x66,0x3C,0x00], // ¿
    [0x30,0x18,0x3C,0x66,0x7E,0x66,0x66,0x66], // À
    [0x0C,0x18,0x3C,0x66,0x7E,0x66,0x66,0x66], // Á
    [0x18,0x66,0x3C,0x66,0x7E,0x66,0x66,0x66], // Â
    [0x32,0x4C,0x3C,0x66,0x7E,0x66,0x66,0x66], // Ã
    [0x66,0x00,0x3C,0x66,0x7E,0x66,0x66,0x66], // Ä
    [0x18,0x24,0x3C,0x66,0x7E,0x66,0x66,0x66], // Å
    [0x3E,0x6C,0xCC,0xFE,0xCC,0xCC,0xCE,0x00], // Æ
    [0x3C,0x66,0x60,0x60,0x60,0x66,0x3C,0x18], // Ç
    [0x30,0x18,0x7E,0x60,0x7C,0x60,0x60,0x7E], // È
    [0x0C,0x18,0x7E,0x60,0x7C,0x60,0x60,0x7E], // É
    [0x18,0x66,0x7E,0x60,0x7C,0x60,0x60,0x7E], // Ê
    [0x66,0x00,0x7E,0x60,0x7C,0x60,0x60,0x7E], // Ë
    [0x30,0x18,0x7E,0x18,0x18,0x18,0x18,0x7E], // Ì
    [0x0C,0x18,0x7E,0x18,0x18,0x18,0x18,0x7E], // Í
    [0x18,0x66,0x7E,0x18,0x18,0x18,0x18,0x7E], // Î
    [0x66,0x00,0x7E,0x18,0x18,0x18,0x18,0x7E], // Ï
    [0x78,0x6C,0x66,0xF6,0x66,0x6C,0x78,0x00], // Ð
    [0x32,0x4C,0x66,0x76,0x7E,0x6E,0x66,0x66], // Ñ
    [0x30,0x18,0x3C,0x66,0x66,0x66,0x66,0x3C], // Ò
    [0x0C,0x18,0x3C,0x66,0x66,0x66,0x66,0x3C], // Ó
    [0x18,0x66,0x3C,0x66,0x66,0x66,0x66,0x3C], // Ô
    [0x32,0x4C,0x3C,0x66,0x66,0x66,0x66,0x3C], // Õ
    [0x66,0x00,0x3C,0x66,0x66,0x66,0x66,0x3C], // Ö
    [0x00,0x66,0x3C,0x18,0x3C,0x66,0x00,0x00], // ×
    [0x3D,0x66,0x6E,0x7E,0x76,0x66,0xBC,0x00], // Ø
    [0x30,0x18,0x66,0x66,0x66,0x66,0x66,0x3C], // Ù
    [0x0C,0x18,0x66,0x66,0x66,0x66,0x66,0x3C], // Ú
    [0x18,0x66,0x66,0x66,0x66,0x66,0x66,0x3C], // Û
    [0x66,0x00,0x66,0x66,0x66,0x66,0x66,0x3C], // Ü
    [0x0C,0x18,0x66,0x66,0x3C,0x18,0x18,0x18], // Ý
    [0x60,0x7C,0x66,0x66,0x7C,0x60,0x60,0x00], // Þ
    [0x3C,0x66,0x66,0x6C,0x66,0x66,0x6C,0x60], // ß
    [0x30,0x18,0x3C,0x06,0x3E,0x66,0x3E,0x00], // à
    [0x0C,0x18,0x3C,0x06,0x3E,0x66,0x3E,0x00], // á
    [0x18,0x66,0x3C,0x06,0x3E,0x66,0x3E,0x00], // â
    [0x32,0x4C,0x3C,0x06,0x3E,0x66,0x3E,0x00], // ã
    [0x66,0x00,0x3C,0x06,0x3E,0x66,0x3E,0x00], // ä
    [0x18,0x24,0x3C,0x06,0x3E,0x66,0x3E,0x00], // å
    [0x00,0x00,0x6C,0x1A,0x7E,0xD8,0x6E,0x00], // æ
    [0x00,0x00,0x3C,0x66,0x60,0x66,0x3C,0x18], // ç
    [0x30,0x18,0x3C,0x66,0x7E,0x60,0x3C,0x00], // è
    [0x0C,0x18,0x3C,0x66,0x7E,0x60,0x3C,0x00], // é
    [0x18,0x66,0x3C,0x66,0x7E,0x60,0x3C,0x00], // ê
    [0x66,0x00,0x3C,0x66,0x7E,0x60,0x3C,0x00], // ë
    [0x30,0x18,0x38,0x18,0x18,0x18,0x3C,0x00], // ì
    [0x0C,0x18,0x38,0x18,0x18,0x18,0x3C,0x00], // í
    [0x18,0x66,0x38,0x18,0x18,0x18,0x3C,0x00], // î
    [0x66,0x00,0x38,0x18,0x18,0x18,0x3C,0x00], // ï
    [0x6C,0x38,0x6C,0x06,0x3E,0x66,0x3C,0x00], // ð
    [0x32,0x4C,0x7C,0x66,0x66,0x66,0x66,0x00], // ñ
    [0x30,0x18,0x3C,0x66,0x66,0x66,0x3C,0x00], // ò
    [0x0C,0x18,0x3C,0x66,0x66,0x66,0x3C,0x00], // ó
    [0x18,0x66,0x3C,0x66,0x66,0x66,0x3C,0x00], // ô
    [0x32,0x4C,0x3C,0x66,0x66,0x66,0x3C,0x00], // õ
    [0x66,0x00,0x3C,0x66,0x66,0x66,0x3C,0x00], // ö
    [0x00,0x18,0x00,0x7E,0x00,0x18,0x00,0x00], // ÷
    [0x00,0x02,0x3C,0x6E,0x7E,0x76,0x3C,0x40], // ø
    [0x30,0x18,0x66,0x66,0x66,0x66,0x3E,0x00], // ù
    [0x0C,0x18,0x66,0x66,0x66,0x66,0x3E,0x00], // ú
    [0x18,0x66,0x66,0x66,0x66,0x66,0x3E,0x00], // û
    [0x66,0x00,0x66,0x66,0x66,0x66,0x3E,0x00], // ü
    [0x0C,0x18,0x66,0x66,0x66,0x3E,0x06,0x3C], // ý
    [0x60,0x60,0x7C,0x66,0x66,0x7C,0x60,0x60], // þ
    [0x66,0x00,0x66,0x66,0x66,0x3E,0x06,0x3C], // ÿ
];

/// Glyph rows for `code`, or the placeholder when the font has no entry.
pub fn glyph(code: u32) -> &'static [u8; 8] {
    code.checked_sub(FIRST)
        .and_then(|i| GLYPHS.get(i as usize))
        .unwrap_or(&PLACEHOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_is_blank() {
        assert_eq!(glyph(' ' as u32), &[0u8; 8]);
    }

    #[test]
    fn test_ascii_lookup() {
        assert_eq!(glyph('A' as u32)[0], 0x3C);
        assert_eq!(glyph('~' as u32)[2], 0x76);
    }

    #[test]
    fn test_latin1_lookup() {
        // é is the lowercase e under an acute accent
        let e = glyph('e' as u32);
        let e_acute = glyph('é' as u32);
        assert_eq!(e_acute[2..], e[2..]);
        assert_eq!(e_acute[..2], [0x0C, 0x18]);
        assert_eq!(glyph('£' as u32)[3], 0x7C);
        assert_ne!(glyph(0x80), &[0u8; 8]);
        assert_eq!(glyph(0xA0), &[0u8; 8]);
        assert_eq!(GLYPHS.len(), 256 - 32);
    }

    #[test]
    fn test_placeholder_outside_table() {
        assert_eq!(glyph(0x100), &PLACEHOLDER);
        assert_eq!(glyph(0x263A), &PLACEHOLDER);
        assert_eq!(glyph(7), &PLACEHOLDER);
    }
}

//! The `param src :=` / `param dst :=` instance sections.

use crate::buffer::DataBuf;

pub fn build_srcdst(buf: &mut DataBuf, src: &str, dst: &str) {
    buf.param("src");
    buf.push(&format!("{src};\n"));
    buf.param("dst");
    buf.push(&format!("{dst};\n"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_both_params() {
        let mut buf = DataBuf::new(false);
        build_srcdst(&mut buf, "A_1", "C_2");
        assert_eq!(buf.data(), "param src := A_1;\nparam dst := C_2;\n");
    }
}

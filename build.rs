use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 生成构建信息，git 不可用时 vergen 会输出占位值
    EmitBuilder::builder()
        .build_timestamp()
        .git_sha(true)
        .emit()?;
    Ok(())
}

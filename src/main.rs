use clap::Parser;
use log::{Level, Log, Metadata, Record};
use opfkit::{DEFAULT_CONFIG_PATH, Epub, EpubConfig, NavPoint, Result};
use std::io::{self, Write};

/// 📚 opfkit - EPUB OPF/NCX检查工具
#[derive(Parser)]
#[command(name = "opfkit")]
#[command(about = "解析并重新序列化EPUB 2的OPF/NCX文档")]
#[command(version)]
struct Args {
    /// EPUB文件路径
    #[arg(help = "要处理的EPUB文件路径", required_unless_present = "init_config")]
    epub_file: Option<String>,

    /// 详细输出模式
    #[arg(short, long, help = "显示详细信息和调试日志")]
    verbose: bool,

    /// 显示元数据信息
    #[arg(short, long, help = "显示OPF元数据信息")]
    metadata: bool,

    /// 显示目录树
    #[arg(short, long, help = "显示NCX导航树")]
    toc: bool,

    /// 输出重新序列化的OPF
    #[arg(long, help = "输出重新序列化后的OPF XML")]
    dump_opf: bool,

    /// 输出重新序列化的NCX
    #[arg(long, help = "输出重新序列化后的NCX XML")]
    dump_ncx: bool,

    /// 配置文件路径
    #[arg(short, long, help = "YAML配置文件路径（默认尝试opfkit.yaml）")]
    config: Option<String>,

    /// 生成默认配置文件
    #[arg(long, help = "在当前目录写出默认配置文件")]
    init_config: bool,
}

/// 输出到标准错误的日志
struct StderrLogger {
    level: Level,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logger(verbose: bool) {
    let level = if verbose { Level::Debug } else { Level::Warn };
    let logger = Box::new(StderrLogger { level });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level.to_level_filter());
    }
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);

    if args.init_config {
        match EpubConfig::write_default_file(DEFAULT_CONFIG_PATH) {
            Ok(()) => println!("✅ 已写出默认配置: {}", DEFAULT_CONFIG_PATH),
            Err(e) => {
                eprintln!("❌ 错误: {}", e);
                std::process::exit(1);
            }
        }
    }

    let Some(path) = args.epub_file.as_deref() else {
        return;
    };

    if let Err(e) = process_epub(path, &args) {
        eprintln!("❌ 错误: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&str>) -> Result<EpubConfig> {
    match path {
        Some(path) => EpubConfig::from_file(path),
        None => Ok(EpubConfig::load_or_default()),
    }
}

fn process_epub(path: &str, args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let indent = config.indent;
    let epub = Epub::open_with_config(path, config)?;

    println!("📦 OPF文件路径: {}", epub.opf_path());
    if let Some(toc_path) = epub.toc_path() {
        println!("🧭 NCX文件路径: {}", toc_path);
    }

    if args.verbose {
        println!("\n📁 EPUB文件内容:");
        for (i, entry) in epub.list_entries().iter().enumerate() {
            println!("  {}. {}", i + 1, entry);
        }
    }

    if args.metadata {
        display_metadata(&epub);
    }

    if args.toc {
        display_table_of_contents(&epub);
    }

    if args.dump_opf || args.dump_ncx {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for (entry, bytes) in epub.serialized_entries(indent)? {
            let is_opf = entry == epub.opf_path();
            if (is_opf && args.dump_opf) || (!is_opf && args.dump_ncx) {
                writeln!(out, "\n<!-- {} -->", entry)?;
                out.write_all(&bytes)?;
                writeln!(out)?;
            }
        }
    }

    Ok(())
}

/// 显示OPF元数据信息
fn display_metadata(epub: &Epub) {
    let package = epub.package();
    let metadata = &package.metadata;

    println!("\n📊 EPUB元数据信息:");
    println!("  📖 EPUB版本: {}", package.version);
    println!("  🔖 唯一标识符: {} [ID: {}]", package.uid.value, package.uid.id);

    for title in &metadata.titles {
        println!("  标题: {}", title.text);
    }
    for (i, creator) in metadata.creators.iter().enumerate() {
        let mut author_info = format!("  作者 {}. {}", i + 1, creator.name);
        if !creator.role.is_empty() {
            author_info.push_str(&format!(" ({})", creator.role));
        }
        if !creator.file_as.is_empty() {
            author_info.push_str(&format!(" [排序: {}]", creator.file_as));
        }
        println!("{}", author_info);
    }
    if !metadata.languages.is_empty() {
        println!("  语言: {}", metadata.languages.join(", "));
    }
    if let Some(publisher) = &metadata.publisher {
        println!("  出版社: {}", publisher);
    }
    for date in &metadata.dates {
        println!("  日期: {} {}", date.date, date.event);
    }
    if let Some(isbn) = metadata.isbn() {
        println!("  ISBN: {}", isbn);
    }
    if !metadata.subjects.is_empty() {
        println!("  🏷️  主题: {}", metadata.subjects.join(", "));
    }
    if let Some(cover) = metadata.meta("cover") {
        println!("  🖼️  封面: {}", cover);
    }

    println!("\n  📁 文件统计:");
    println!("    清单项目: {} 个", package.manifest.len());
    println!("    脊柱项目: {} 个 (线性 {} 个)", package.spine.len(), package.linear_items().len());
    println!(
        "    图片文件: {} 个",
        package.manifest.iter().filter(|item| item.is_image()).count()
    );
    println!(
        "    样式文件: {} 个",
        package.manifest.iter().filter(|item| item.is_css()).count()
    );
    println!("    指南引用: {} 个", package.guide.len());
}

/// 显示NCX导航树
fn display_table_of_contents(epub: &Epub) {
    let Some(toc) = epub.toc() else {
        println!("\n🌳 没有NCX导航");
        return;
    };

    println!("\n🌳 {} (深度 {})", toc.title, toc.nav_map.depth());
    for nav_point in &toc.nav_map.nav_points {
        print_nav_point(nav_point, 1);
    }

    if let Some(page_list) = &toc.page_list {
        println!("\n📄 页面目标: {} 个", page_list.page_targets.len());
    }
}

fn print_nav_point(nav_point: &NavPoint, level: usize) {
    println!(
        "{}├─ {} -> {}",
        "  ".repeat(level),
        nav_point.label().unwrap_or_default(),
        nav_point.src
    );
    for child in &nav_point.nav_points {
        print_nav_point(child, level + 1);
    }
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memory_inspect::core::types::{Address, ModuleInfo};
use memory_inspect::dissect::{explore_address, Dissection, Explorer};
use memory_inspect::evaluator::{evaluate, module_identifiers};
use memory_inspect::memory::{find_code_caves, ProtectionFlags};
use memory_inspect::process::{ProcessMemory, ProcessMemoryExt, SnapshotProcess};

const BASE: Address = Address::new(0x10000);

/// A heap of small structs that point at each other
fn heap() -> SnapshotProcess {
    let process = SnapshotProcess::with_buffer(BASE, vec![0; 0x10000]).unwrap();
    for index in 0..0x100usize {
        let node = BASE.add(index * 0x100);
        let next = BASE.add(((index + 1) % 0x100) * 0x100);
        process.write::<u64>(node, next.as_usize() as u64).unwrap();
        process.write::<f64>(node.add(0x8), index as f64 * 1.5).unwrap();
        process.write::<i32>(node.add(0x10), index as i32).unwrap();
        process
            .write_memory(node.add(0x20), b"node_name_here\0")
            .unwrap();
    }
    process
}

fn benchmark_explore(c: &mut Criterion) {
    let process = heap();

    c.bench_function("explore_0x400", |b| {
        b.iter(|| black_box(explore_address(&process, BASE, 0x400)));
    });

    let explorer = Explorer::default();
    c.bench_function("dissect_expand_chain", |b| {
        b.iter(|| {
            let mut dissection = Dissection::new(&process, "node", BASE, &explorer);
            let mut path = vec![0];
            for _ in 0..8 {
                dissection.expand(&process, &path, &explorer);
                path.push(0);
            }
            black_box(dissection)
        });
    });
}

fn benchmark_evaluate(c: &mut Criterion) {
    let modules: Vec<ModuleInfo> = (0..64usize)
        .map(|i| ModuleInfo::new(format!("module{}.dll", i), Address::new(0x7FF800000000 + i * 0x100000), 0x10000))
        .collect();
    let identifiers = module_identifiers(&modules);

    c.bench_function("evaluate_expression", |b| {
        b.iter(|| black_box(evaluate(black_box("MODULE42.DLL + 0x1F0 * 2 - 10"), &identifiers)));
    });
}

fn benchmark_code_caves(c: &mut Criterion) {
    let process = SnapshotProcess::new();
    let mut text = vec![0x48u8; 0x40000];
    for start in (0..text.len()).step_by(0x1000) {
        text[start..start + 0x80].fill(0xCC);
    }
    process
        .map_region(Address::new(0x400000), text, ProtectionFlags::execute_read())
        .unwrap();

    c.bench_function("find_code_caves", |b| {
        b.iter(|| black_box(find_code_caves(&process, 0x50, false, ProtectionFlags::EXECUTABLE_MASK)));
    });
}

criterion_group!(benches, benchmark_explore, benchmark_evaluate, benchmark_code_caves);
criterion_main!(benches);
